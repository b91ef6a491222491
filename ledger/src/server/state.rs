//! Application state for the ledger HTTP server.

use std::sync::Arc;

use crate::ledger::Ledger;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The ledger every handler dispatches to
    pub ledger: Arc<Ledger>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }
}
