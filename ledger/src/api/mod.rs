//! HTTP API for the club ticket ledger.
//!
//! Handlers are organized by the record they work on:
//! - Clubs: registration and lookups
//! - Events: creation, details, ticket purchase and verification
//! - Assets: opt-in, asset parameters and balances
//!
//! The payment gateway in front of this API authenticates callers and asserts
//! their address in `X-Caller-Address`. Payments travel in the JSON body of
//! the call they pay for.

pub mod assets;
pub mod clubs;
pub mod events;

pub use assets::{get_asset, get_balance, opt_in};
pub use clubs::{get_club_name, is_club_registered, register_club};
pub use events::{buy_ticket, create_event, get_event, get_total_events, verify_ticket};

use clubticket_web::{AppError, Caller};

use crate::error::LedgerError;
use crate::types::{Address, CallContext};

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let code = err.kind();
        match err {
            LedgerError::EventNotFound(event_id) => Self::not_found("event", event_id).with_code(code),
            LedgerError::AssetNotFound(asset_id) => Self::not_found("asset", asset_id).with_code(code),
            LedgerError::AlreadyRegistered(_) | LedgerError::SoldOut(_) => {
                Self::conflict(err.to_string()).with_code(code)
            },
            LedgerError::PaymentMismatch(_) => Self::payment_required(err.to_string()).with_code(code),
            LedgerError::ClubNotRegistered(_) | LedgerError::NotOptedIn { .. } => {
                Self::forbidden(err.to_string()).with_code(code)
            },
            LedgerError::InvalidInput(_)
            | LedgerError::EventInPast { .. }
            | LedgerError::InvalidPrice
            | LedgerError::InvalidQuantity { .. } => Self::validation(err.to_string()).with_code(code),
            LedgerError::Storage(_) => Self::unavailable(err.to_string()).with_code(code),
        }
    }
}

/// Parse an address taken from a path segment.
///
/// # Errors
///
/// Returns a 422 `INVALID_INPUT` error for a malformed address.
pub fn parse_address(raw: &str) -> Result<Address, AppError> {
    Ok(Address::parse(raw)?)
}

/// Build the call context for a request without payment.
///
/// # Errors
///
/// Returns a 422 `INVALID_INPUT` error if the caller header is not a valid address.
pub fn call_context(caller: &Caller) -> Result<CallContext, AppError> {
    Ok(CallContext::new(parse_address(&caller.0)?))
}
