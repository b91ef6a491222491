//! In-memory [`Journal`] implementation.

use clubticket_core::event::SerializedEvent;
use clubticket_core::journal::{Journal, JournalError, JournalFuture};
use clubticket_core::stream::{StreamId, Version};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type Streams = HashMap<StreamId, Vec<SerializedEvent>>;

/// Process-local journal backed by a `HashMap` of streams.
///
/// Appends to one stream are checked and written under a single lock, so the
/// optimistic concurrency check cannot race with another writer.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    streams: Mutex<Streams>,
}

impl InMemoryJournal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of facts across all streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock()
            .map(|streams| streams.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Whether no fact has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of every stream written so far, sorted.
    #[must_use]
    pub fn stream_ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self
            .lock()
            .map(|streams| streams.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn lock(&self) -> Result<MutexGuard<'_, Streams>, JournalError> {
        self.streams
            .lock()
            .map_err(|_| JournalError::Unavailable("journal lock poisoned".to_string()))
    }

    fn append_now(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Result<Version, JournalError> {
        let mut streams = self.lock()?;
        let stream = streams.entry(stream_id.clone()).or_default();
        let actual = Version::new(stream.len() as u64);

        if let Some(expected) = expected_version {
            if expected != actual {
                return Err(JournalError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual,
                });
            }
        }

        let appended = events.len() as u64;
        stream.extend(events);
        Ok(actual.advance(appended))
    }

    fn load_now(
        &self,
        stream_id: &StreamId,
        from_version: Option<Version>,
    ) -> Result<Vec<SerializedEvent>, JournalError> {
        let streams = self.lock()?;
        let skip = from_version.map_or(0, |v| usize::try_from(v.value()).unwrap_or(usize::MAX));
        Ok(streams
            .get(stream_id)
            .map(|stream| stream.iter().skip(skip).cloned().collect())
            .unwrap_or_default())
    }
}

impl Journal for InMemoryJournal {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> JournalFuture<'_, Version> {
        let result = self.append_now(stream_id, expected_version, events);
        Box::pin(async move { result })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> JournalFuture<'_, Vec<SerializedEvent>> {
        let result = self.load_now(&stream_id, from_version);
        Box::pin(async move { result })
    }

    fn stream_version(&self, stream_id: StreamId) -> JournalFuture<'_, Version> {
        let result = self.lock().map(|streams| {
            Version::new(streams.get(&stream_id).map_or(0, Vec::len) as u64)
        });
        Box::pin(async move { result })
    }
}
