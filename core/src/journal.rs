//! The journal: append-only storage for committed facts.
//!
//! The [`Journal`] trait is the persistence seam of the ledger. A `Store` appends a
//! fact to its stream *before* applying it to in-memory state, so a journal refusal
//! leaves the ledger exactly as it was.
//!
//! Appends use optimistic concurrency: the caller names the version it believes the
//! stream is at, and the journal refuses the append if another writer got there first.
//!
//! # Implementations
//!
//! - `FileJournal` (in `clubticket-runtime`): append-only file, the server default
//! - `PostgresJournal` (in `clubticket-postgres`): one table row per fact
//! - `InMemoryJournal` (in `clubticket-runtime`): process-local, for tests and demos
//! - `FailingJournal` (in `clubticket-testing`): refuses every append, for atomicity tests

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`Journal`] methods.
///
/// Explicit boxing keeps the trait dyn-compatible so stores can share an
/// `Arc<dyn Journal>`.
pub type JournalFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, JournalError>> + Send + 'a>>;

/// Errors that can occur during journal operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// The stream moved on since the caller last read it.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream where the conflict occurred.
        stream_id: StreamId,
        /// The version the caller expected.
        expected: Version,
        /// The stream's actual version.
        actual: Version,
    },

    /// The backing storage refused or failed the operation.
    #[error("Journal unavailable: {0}")]
    Unavailable(String),

    /// A stored fact could not be decoded while loading.
    #[error("Corrupt journal entry in {stream_id} at version {version}: {reason}")]
    Corrupt {
        /// The stream holding the entry.
        stream_id: StreamId,
        /// Position of the entry (1-based).
        version: Version,
        /// Decoder message.
        reason: String,
    },
}

/// Append-only, per-stream storage of serialized facts.
pub trait Journal: Send + Sync {
    /// Append facts to a stream.
    ///
    /// With `expected_version = Some(v)` the append only succeeds if the stream is
    /// currently at `v`; `None` appends unconditionally. Returns the stream's new
    /// version. An empty `events` vector is a no-op that still checks the version.
    ///
    /// # Errors
    ///
    /// - [`JournalError::ConcurrencyConflict`] if the expected version is stale
    /// - [`JournalError::Unavailable`] if the storage refused the write
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> JournalFuture<'_, Version>;

    /// Load a stream's facts in commit order.
    ///
    /// `from_version = Some(v)` skips the first `v` facts. A stream that was never
    /// written is empty, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Unavailable`] if the storage cannot be read.
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> JournalFuture<'_, Vec<SerializedEvent>>;

    /// Current version of a stream (`Version::INITIAL` if never written).
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Unavailable`] if the storage cannot be read.
    fn stream_version(&self, stream_id: StreamId) -> JournalFuture<'_, Version>;
}
