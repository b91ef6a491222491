//! Errors returned by ledger operations.
//!
//! Every variant is terminal: the caller has to change the request before
//! retrying, and a rejected call leaves all records exactly as they were.

use clubticket_core::journal::JournalError;
use clubticket_runtime::StoreError;
use thiserror::Error;

use crate::types::{AssetId, EventId};

/// Why a ledger operation was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The caller already owns a club record.
    #[error("club {0} is already registered")]
    AlreadyRegistered(String),

    /// The caller is not a registered club.
    #[error("{0} is not a registered club")]
    ClubNotRegistered(String),

    /// A field is empty, too long or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No event with this id exists.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// The event date is not strictly after the current ledger time.
    #[error("event date {date} is not after current time {now}")]
    EventInPast {
        /// Requested date (unix seconds)
        date: u64,
        /// Ledger time at the call (unix seconds)
        now: i64,
    },

    /// Ticket price must be positive.
    #[error("ticket price must be greater than zero")]
    InvalidPrice,

    /// Ticket quantity outside `1..=max`.
    #[error("ticket quantity {quantity} must be between 1 and {max}")]
    InvalidQuantity {
        /// Requested quantity
        quantity: u64,
        /// Configured maximum
        max: u64,
    },

    /// The attached payment does not match the ticket.
    #[error("payment mismatch: {0}")]
    PaymentMismatch(String),

    /// The buyer has not opted in to the event's ticket asset.
    #[error("{holder} has not opted in to asset {asset_id}")]
    NotOptedIn {
        /// Buyer address
        holder: String,
        /// Ticket asset
        asset_id: AssetId,
    },

    /// Every ticket for the event has been issued.
    #[error("event {0} is sold out")]
    SoldOut(EventId),

    /// No ticket asset with this id exists.
    #[error("asset {0} not found")]
    AssetNotFound(AssetId),

    /// The journal refused the write; nothing was committed.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Stable code for metrics labels and HTTP error bodies.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::ClubNotRegistered(_) => "CLUB_NOT_REGISTERED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::EventInPast { .. } => "EVENT_IN_PAST",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::PaymentMismatch(_) => "PAYMENT_MISMATCH",
            Self::NotOptedIn { .. } => "NOT_OPTED_IN",
            Self::SoldOut(_) => "SOLD_OUT",
            Self::AssetNotFound(_) => "ASSET_NOT_FOUND",
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Whether the journal, rather than validation, refused the call.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<JournalError> for LedgerError {
    fn from(err: JournalError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<StoreError<LedgerError>> for LedgerError {
    fn from(err: StoreError<LedgerError>) -> Self {
        match err {
            StoreError::Rejected(rejection) => rejection,
            StoreError::Journal(journal) => journal.into(),
            StoreError::Encoding(encoding) => Self::Storage(encoding.to_string()),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(LedgerError::SoldOut(EventId::new(1)).kind(), "SOLD_OUT");
        assert_eq!(LedgerError::InvalidPrice.kind(), "INVALID_PRICE");
        assert_eq!(
            LedgerError::PaymentMismatch("amount".into()).kind(),
            "PAYMENT_MISMATCH"
        );
    }

    #[test]
    fn journal_errors_become_storage() {
        let err: LedgerError = JournalError::Unavailable("disk full".into()).into();
        assert!(err.is_storage());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn store_rejections_pass_through() {
        let rejected: LedgerError = StoreError::Rejected(LedgerError::InvalidPrice).into();
        assert_eq!(rejected, LedgerError::InvalidPrice);

        let failed: LedgerError =
            StoreError::<LedgerError>::Journal(JournalError::Unavailable("down".into())).into();
        assert_eq!(failed.kind(), "STORAGE_UNAVAILABLE");
    }

    #[test]
    fn messages_name_the_subject() {
        let err = LedgerError::InvalidQuantity {
            quantity: 10_001,
            max: 10_000,
        };
        assert_eq!(
            err.to_string(),
            "ticket quantity 10001 must be between 1 and 10000"
        );
    }
}
