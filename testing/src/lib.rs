//! # Clubticket Testing
//!
//! Testing utilities for the club ticket ledger.
//!
//! This crate provides:
//! - A fixed clock for deterministic "is this date in the future" checks
//! - A journal that refuses every write, for atomicity tests
//! - A journal that stalls appends to one stream, for isolation tests
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```
//! use clubticket_core::environment::Clock;
//! use clubticket_testing::test_clock;
//!
//! let clock = test_clock();
//! assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
//! ```

use chrono::{DateTime, Utc};
use clubticket_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use clubticket_core::event::SerializedEvent;
    use clubticket_core::journal::{Journal, JournalError, JournalFuture};
    use clubticket_core::stream::{StreamId, Version};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use clubticket_testing::mocks::FixedClock;
    /// use clubticket_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Journal whose storage is permanently down.
    ///
    /// Appends and loads fail with [`JournalError::Unavailable`]. Counts append
    /// attempts so tests can check a write was actually tried.
    #[derive(Debug, Default)]
    pub struct FailingJournal {
        attempts: AtomicUsize,
    }

    impl FailingJournal {
        /// Create a failing journal.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of append attempts so far.
        #[must_use]
        pub fn append_attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Journal for FailingJournal {
        fn append_events(
            &self,
            stream_id: StreamId,
            _expected_version: Option<Version>,
            _events: Vec<SerializedEvent>,
        ) -> JournalFuture<'_, Version> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Err(JournalError::Unavailable(format!(
                    "refusing append to {stream_id}"
                )))
            })
        }

        fn load_events(
            &self,
            stream_id: StreamId,
            _from_version: Option<Version>,
        ) -> JournalFuture<'_, Vec<SerializedEvent>> {
            Box::pin(async move {
                Err(JournalError::Unavailable(format!(
                    "refusing load of {stream_id}"
                )))
            })
        }

        fn stream_version(&self, _stream_id: StreamId) -> JournalFuture<'_, Version> {
            Box::pin(async { Ok(Version::INITIAL) })
        }
    }

    /// Journal that holds every append to one stream for a fixed delay.
    ///
    /// Everything is forwarded to `inner`; appends to `stalled` sleep first. Lets
    /// tests keep one store's write in flight while they exercise the others.
    pub struct SlowJournal {
        inner: Arc<dyn Journal>,
        stalled: StreamId,
        delay: Duration,
    }

    impl SlowJournal {
        /// Wrap `inner`, delaying appends to `stalled` by `delay`.
        #[must_use]
        pub fn new(inner: Arc<dyn Journal>, stalled: StreamId, delay: Duration) -> Self {
            Self {
                inner,
                stalled,
                delay,
            }
        }
    }

    impl std::fmt::Debug for SlowJournal {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SlowJournal")
                .field("stalled", &self.stalled)
                .field("delay", &self.delay)
                .finish_non_exhaustive()
        }
    }

    impl Journal for SlowJournal {
        fn append_events(
            &self,
            stream_id: StreamId,
            expected_version: Option<Version>,
            events: Vec<SerializedEvent>,
        ) -> JournalFuture<'_, Version> {
            let delay = (stream_id == self.stalled).then_some(self.delay);
            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.inner
                    .append_events(stream_id, expected_version, events)
                    .await
            })
        }

        fn load_events(
            &self,
            stream_id: StreamId,
            from_version: Option<Version>,
        ) -> JournalFuture<'_, Vec<SerializedEvent>> {
            self.inner.load_events(stream_id, from_version)
        }

        fn stream_version(&self, stream_id: StreamId) -> JournalFuture<'_, Version> {
            self.inner.stream_version(stream_id)
        }
    }
}

// Re-export commonly used items
pub use mocks::{FailingJournal, FixedClock, SlowJournal, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clubticket_core::journal::{Journal, JournalError};
    use clubticket_core::stream::StreamId;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[tokio::test]
    async fn failing_journal_refuses_appends() {
        let journal = FailingJournal::new();

        let err = journal
            .append_events(StreamId::new("clubs"), None, Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, JournalError::Unavailable(_)));
        assert_eq!(journal.append_attempts(), 1);
    }
}
