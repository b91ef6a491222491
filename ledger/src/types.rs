//! Domain types for the club ticket ledger.
//!
//! Identifiers, the caller/payment context every mutating call carries, and the
//! records the ledger keeps for clubs, events and ticket assets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};

// ============================================================================
// Limits
// ============================================================================

/// Longest accepted account address, in bytes.
pub const MAX_ADDRESS_LEN: usize = 64;

/// Longest accepted club name, in bytes.
pub const MAX_CLUB_NAME_LEN: usize = 64;

/// Longest accepted club contact, in bytes.
pub const MAX_CONTACT_LEN: usize = 128;

/// Longest accepted event name, in bytes.
pub const MAX_EVENT_NAME_LEN: usize = 64;

/// Longest accepted venue, in bytes.
pub const MAX_VENUE_LEN: usize = 64;

/// Hard ceiling on tickets per event. Configuration may only lower it.
pub const MAX_TICKETS_PER_EVENT: u64 = 10_000;

/// Trim `value` and check it is non-empty and at most `max` bytes.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidInput`] naming `field` otherwise.
pub fn bounded_text(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{field} must not be empty")));
    }
    if trimmed.len() > max {
        return Err(LedgerError::InvalidInput(format!(
            "{field} is {} bytes, limit is {max}",
            trimmed.len()
        )));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Identifiers
// ============================================================================

/// An account on the ledger: a club, a buyer, or the ledger itself.
///
/// Addresses are ASCII alphanumeric and at most [`MAX_ADDRESS_LEN`] bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Validate and wrap an address.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidInput`] for an empty, overlong or
    /// non-alphanumeric address.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LedgerError::InvalidInput("address must not be empty".to_string()));
        }
        if raw.len() > MAX_ADDRESS_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "address is {} bytes, limit is {MAX_ADDRESS_LEN}",
                raw.len()
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(LedgerError::InvalidInput(format!(
                "address {raw:?} must be ASCII alphanumeric"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// The address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event identifier, assigned by the registry starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an event's ticket asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u64);

impl AssetId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount in the smallest currency unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Wrap a raw amount.
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// The raw amount.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Whether this is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Call context
// ============================================================================

/// A value transfer attached to a call by the payment gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Paying account
    pub sender: Address,
    /// Receiving account
    pub receiver: Address,
    /// Amount transferred
    pub amount: Amount,
}

/// The already-authenticated caller of a mutating operation, plus any payment
/// the gateway attached to the same call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Account that authorized the call
    pub caller: Address,
    /// Value transfer bound to the call
    pub payment: Option<Payment>,
}

impl CallContext {
    /// A call without payment.
    #[must_use]
    pub const fn new(caller: Address) -> Self {
        Self {
            caller,
            payment: None,
        }
    }

    /// Attach a payment.
    #[must_use]
    pub fn with_payment(mut self, payment: Payment) -> Self {
        self.payment = Some(payment);
        self
    }
}

// ============================================================================
// Records
// ============================================================================

/// A registered club. Never mutated once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubRecord {
    /// The club's account, its identity key
    pub owner: Address,
    /// Display name
    pub name: String,
    /// Contact details
    pub contact: String,
}

/// A ticketed event and its sale counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Registry-assigned id
    pub event_id: EventId,
    /// Organizing club
    pub owner: Address,
    /// Event name
    pub name: String,
    /// Venue
    pub venue: String,
    /// Start time, unix seconds
    pub event_date: u64,
    /// Price of one ticket
    pub ticket_price: Amount,
    /// Fixed supply
    pub total_tickets: u64,
    /// Tickets issued so far; the only field that changes
    pub sold_tickets: u64,
    /// Ticket asset minted with the event
    pub asset_id: AssetId,
}

impl EventRecord {
    /// Tickets still held by the ledger.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.total_tickets.saturating_sub(self.sold_tickets)
    }

    /// Whether every ticket has been issued. Permanent once true.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.sold_tickets >= self.total_tickets
    }
}

/// Parameters of `create_event`, as supplied by the organizing club.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event name, also the ticket asset name
    pub name: String,
    /// Venue
    pub venue: String,
    /// Start time, unix seconds
    pub event_date: u64,
    /// Price of one ticket
    pub ticket_price: Amount,
    /// Ticket supply
    pub total_tickets: u64,
}

/// Read-only view of an event returned by `get_event_details`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Organizing club
    pub owner: Address,
    /// Event name
    pub name: String,
    /// Venue
    pub venue: String,
    /// Start time, unix seconds
    pub date: u64,
    /// Ticket price
    pub price: Amount,
    /// Fixed supply
    pub total: u64,
    /// Tickets issued
    pub sold: u64,
    /// Ticket asset
    pub asset_id: AssetId,
}

impl From<&EventRecord> for EventDetails {
    fn from(record: &EventRecord) -> Self {
        Self {
            owner: record.owner.clone(),
            name: record.name.clone(),
            venue: record.venue.clone(),
            date: record.event_date,
            price: record.ticket_price,
            total: record.total_tickets,
            sold: record.sold_tickets,
            asset_id: record.asset_id,
        }
    }
}

/// Parameters of an event's fixed-supply ticket asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAssetParams {
    /// Asset id
    pub asset_id: AssetId,
    /// Asset name (the event name)
    pub asset_name: String,
    /// Unit name, `TKT` unless configured otherwise
    pub unit_name: String,
    /// Informational URL
    pub url: String,
    /// Fixed supply
    pub total: u64,
    /// Always zero: tickets are indivisible
    pub decimals: u8,
    /// Account allowed to manage the asset (the ledger)
    pub manager: Address,
    /// Account holding unsold units (the ledger)
    pub reserve: Address,
}

/// Proof of a successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReceipt {
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Ticket asset transferred
    pub asset_id: AssetId,
    /// New holder
    pub holder: Address,
    /// Position of this sale, 1-based (equals `soldTickets` after the sale)
    pub serial: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn address_accepts_alphanumeric() {
        let address = Address::parse("  MLSC0WNER ").unwrap();
        assert_eq!(address.as_str(), "MLSC0WNER");
    }

    #[test]
    fn address_rejects_malformed_input() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("has space").is_err());
        assert!(Address::parse("dash-ed").is_err());
        assert!(Address::parse(&"A".repeat(MAX_ADDRESS_LEN + 1)).is_err());
        assert!(Address::parse(&"A".repeat(MAX_ADDRESS_LEN)).is_ok());
    }

    #[test]
    fn bounded_text_counts_bytes() {
        assert_eq!(bounded_text("name", " MLSC ", 4).unwrap(), "MLSC");
        assert!(bounded_text("name", "   ", 4).is_err());
        // four characters, eight bytes
        assert!(bounded_text("name", "éééé", 4).is_err());
    }

    #[test]
    fn record_remaining_and_sold_out() {
        let mut record = EventRecord {
            event_id: EventId::new(1),
            owner: Address::parse("CLUB").unwrap(),
            name: "Hexpiration".to_string(),
            venue: "Lab A".to_string(),
            event_date: 1_900_000_000,
            ticket_price: Amount::new(3_000_000),
            total_tickets: 2,
            sold_tickets: 1,
            asset_id: AssetId::new(1001),
        };
        assert_eq!(record.remaining(), 1);
        assert!(!record.is_sold_out());

        record.sold_tickets = 2;
        assert_eq!(record.remaining(), 0);
        assert!(record.is_sold_out());

        let details = EventDetails::from(&record);
        assert_eq!(details.sold, 2);
        assert_eq!(details.asset_id, AssetId::new(1001));
    }
}
