//! Facts recorded in the journal.
//!
//! A fact (an "event" in event-sourcing terms, not to be confused with a ticketed
//! event) is something the ledger has committed: a club registered, an event was
//! created, a ticket was issued. Facts are immutable and are the unit written to the
//! [`Journal`](crate::journal::Journal).
//!
//! Facts are encoded with `bincode`. The type name stored next to the bytes carries a
//! schema version (`"TicketIssued.v1"`) so the decoder can reject payloads it does
//! not understand instead of misreading them.
//!
//! ```
//! use clubticket_core::event::{Event, SerializedEvent};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! enum ClubFact {
//!     Registered { owner: String },
//! }
//!
//! impl Event for ClubFact {
//!     const EVENT_TYPES: &'static [&'static str] = &["ClubRegistered.v1"];
//!
//!     fn event_type(&self) -> &'static str {
//!         "ClubRegistered.v1"
//!     }
//! }
//!
//! let fact = ClubFact::Registered { owner: "CLUBA".to_string() };
//! let stored = SerializedEvent::from_event(&fact, None).unwrap();
//! assert_eq!(stored.event_type, "ClubRegistered.v1");
//! assert_eq!(ClubFact::from_bytes(&stored.data).unwrap(), fact);
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding or decoding facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The fact could not be encoded.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// The stored bytes could not be decoded into the expected fact type.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// The stored type name is not one this decoder knows.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// A committed fact that can be journaled and replayed.
pub trait Event: Send + Sync + 'static {
    /// Every type name [`event_type`](Event::event_type) can return.
    ///
    /// Decoding refuses stored facts whose type name is not listed here.
    const EVENT_TYPES: &'static [&'static str];

    /// Stable, versioned type name (e.g. `"EventCreated.v1"`).
    fn event_type(&self) -> &'static str;

    /// Encode this fact with bincode.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if encoding fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Decode a fact previously produced by [`Event::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes are corrupt or were
    /// written by an incompatible schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A fact in its stored form: type name, bincode payload, optional JSON metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// Versioned type name (e.g. `"TicketIssued.v1"`).
    pub event_type: String,

    /// The bincode-encoded fact.
    pub data: Vec<u8>,

    /// Optional metadata such as `correlation_id` or the submitting `caller`.
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a serialized fact from raw parts.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Encode a fact into its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the fact cannot be encoded.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Decode the payload, checking that the stored type name is one `E` produces.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEventType`] when the type name is not in
    /// `E::EVENT_TYPES`, or [`EventError::DeserializationError`] when the payload
    /// is unreadable.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        if !E::EVENT_TYPES.contains(&self.event_type.as_str()) {
            return Err(EventError::UnknownEventType(self.event_type.clone()));
        }
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum SaleFact {
        Issued { event_id: u64, serial: u32 },
        OptedIn { holder: String },
    }

    impl Event for SaleFact {
        const EVENT_TYPES: &'static [&'static str] = &["TicketIssued.v1", "HolderOptedIn.v1"];

        fn event_type(&self) -> &'static str {
            match self {
                Self::Issued { .. } => "TicketIssued.v1",
                Self::OptedIn { .. } => "HolderOptedIn.v1",
            }
        }
    }

    #[test]
    fn stored_form_keeps_type_name_and_metadata() {
        let fact = SaleFact::Issued {
            event_id: 1,
            serial: 3,
        };
        let metadata = serde_json::json!({ "caller": "BUYER" });

        let stored = SerializedEvent::from_event(&fact, Some(metadata.clone())).unwrap();

        assert_eq!(stored.event_type, "TicketIssued.v1");
        assert!(!stored.data.is_empty());
        assert_eq!(stored.metadata, Some(metadata));
        assert_eq!(stored.decode::<SaleFact>().unwrap(), fact);
    }

    #[test]
    fn decode_rejects_unknown_type_names() {
        let mut stored = SerializedEvent::from_event(
            &SaleFact::OptedIn {
                holder: "BUYER".to_string(),
            },
            None,
        )
        .unwrap();
        stored.event_type = "TicketResold.v1".to_string();

        let err = stored.decode::<SaleFact>().unwrap_err();
        assert_eq!(err, EventError::UnknownEventType("TicketResold.v1".to_string()));
    }

    #[test]
    fn decode_rejects_corrupt_payloads() {
        let stored = SerializedEvent::new("TicketIssued.v1".to_string(), vec![0xff], None);
        assert!(matches!(
            stored.decode::<SaleFact>(),
            Err(EventError::DeserializationError(_))
        ));
    }

    #[test]
    fn display_shows_type_and_size() {
        let stored = SerializedEvent::new("TicketIssued.v1".to_string(), vec![1, 2, 3], None);
        let display = stored.to_string();
        assert!(display.contains("TicketIssued.v1"));
        assert!(display.contains("3 bytes"));
    }
}
