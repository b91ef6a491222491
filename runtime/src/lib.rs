//! # Clubticket Runtime
//!
//! Runtime for the ledger's aggregates.
//!
//! ## Core Components
//!
//! - **Store**: owns one aggregate's state and serializes its commands
//! - **`FileJournal`**: a durable, append-only file [`Journal`]
//! - **`InMemoryJournal`**: the process-local [`Journal`] implementation, for tests and demos
//! - **Metrics**: Prometheus recorder and ledger counters
//! - **Health**: component checks aggregated into a report
//!
//! ## Example
//!
//! ```
//! use clubticket_core::event::Event;
//! use clubticket_core::reducer::Reducer;
//! use clubticket_core::stream::StreamId;
//! use clubticket_runtime::{InMemoryJournal, Store};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! struct Admitted;
//!
//! impl Event for Admitted {
//!     const EVENT_TYPES: &'static [&'static str] = &["Admitted.v1"];
//!     fn event_type(&self) -> &'static str {
//!         "Admitted.v1"
//!     }
//! }
//!
//! struct Gate;
//!
//! impl Reducer for Gate {
//!     type State = u32;
//!     type Action = ();
//!     type Event = Admitted;
//!     type Environment = ();
//!     type Error = String;
//!
//!     fn decide(&self, admitted: &u32, _: (), _: &()) -> Result<Admitted, String> {
//!         if *admitted < 2 { Ok(Admitted) } else { Err("full".to_string()) }
//!     }
//!
//!     fn apply(&self, admitted: &mut u32, _: &Admitted) {
//!         *admitted += 1;
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let store = Store::new("gate", StreamId::new("gate-1"), 0, Gate, (), Arc::new(InMemoryJournal::new()));
//! store.send(()).await.unwrap();
//! assert_eq!(store.state(|admitted| *admitted), 1);
//! # });
//! ```

use clubticket_core::journal::Journal;
use serde::Serialize;
use std::sync::Arc;

/// Append-only file journal
pub mod file_journal;

/// In-memory journal
pub mod journal;

/// Prometheus metrics for observability
pub mod metrics;

pub use error::StoreError;
pub use file_journal::FileJournal;
pub use journal::InMemoryJournal;
pub use store::Store;

/// Error types for the Store runtime
pub mod error {
    use clubticket_core::event::EventError;
    use clubticket_core::journal::JournalError;
    use thiserror::Error;

    /// Why a command sent to a [`Store`](crate::Store) did not commit.
    ///
    /// In every case the store's state and version are unchanged.
    #[derive(Error, Debug)]
    pub enum StoreError<E> {
        /// The reducer refused the command.
        #[error("{0}")]
        Rejected(E),

        /// The journal refused or failed the append.
        #[error(transparent)]
        Journal(#[from] JournalError),

        /// The fact could not be encoded for the journal.
        #[error(transparent)]
        Encoding(#[from] EventError),
    }

    impl<E> StoreError<E> {
        /// The reducer's rejection, if that is what this is.
        #[must_use]
        pub const fn rejection(&self) -> Option<&E> {
            match self {
                Self::Rejected(e) => Some(e),
                Self::Journal(_) | Self::Encoding(_) => None,
            }
        }
    }
}

/// Health check status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is operational but experiencing issues
    Degraded,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Optional metadata (stream version, counts)
    pub metadata: Vec<(String, String)>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            metadata: Vec::new(),
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Add metadata to the health check
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// Aggregated health report
///
/// Combines multiple health checks into an overall system status.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall system status (worst of all checks)
    pub status: HealthStatus,

    /// Individual component checks
    pub checks: Vec<HealthCheck>,

    /// Timestamp when report was generated
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Create a new health report from checks
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Self {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Check if overall system is healthy
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Store module - the runtime for one aggregate instance
pub mod store {
    use super::{Arc, HealthCheck, Journal, StoreError};
    use crate::metrics::{CommandOutcome, LedgerMetrics};
    use arc_swap::ArcSwap;
    use clubticket_core::event::{Event, SerializedEvent};
    use clubticket_core::journal::JournalError;
    use clubticket_core::reducer::Reducer;
    use clubticket_core::stream::{StreamId, Version};
    use serde::{Serialize, de::DeserializeOwned};
    use std::fmt::Display;
    use std::time::Instant;
    use tokio::sync::Mutex;

    struct Committed<S> {
        state: S,
        version: Version,
    }

    /// The Store - runtime coordinator for one aggregate instance
    ///
    /// The Store owns:
    /// 1. The last committed state and the journal version it reflects
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. A handle on the shared journal
    ///
    /// Commands are handled one at a time under the writer lock: decide against the
    /// committed snapshot, append the fact to this store's stream, apply it to a copy
    /// and publish the copy. Readers load the published snapshot without locking, so
    /// they never wait on a writer, even one whose journal append is still in flight.
    /// Two stores never contend with each other.
    pub struct Store<R>
    where
        R: Reducer,
    {
        kind: &'static str,
        stream_id: StreamId,
        writer: Mutex<()>,
        committed: ArcSwap<Committed<R::State>>,
        reducer: R,
        environment: R::Environment,
        journal: Arc<dyn Journal>,
    }

    impl<R> Store<R>
    where
        R: Reducer + Send + Sync,
        R::State: Clone + Send + Sync,
        R::Environment: Send + Sync,
        R::Event: Event + Serialize + DeserializeOwned + Clone,
        R::Error: Display,
    {
        /// Create a store at version zero.
        ///
        /// `kind` labels metrics and logs (`"clubs"`, `"event"`); `stream_id` names
        /// the journal stream this store writes to.
        #[must_use]
        pub fn new(
            kind: &'static str,
            stream_id: StreamId,
            initial_state: R::State,
            reducer: R,
            environment: R::Environment,
            journal: Arc<dyn Journal>,
        ) -> Self {
            Self {
                kind,
                stream_id,
                writer: Mutex::new(()),
                committed: ArcSwap::from_pointee(Committed {
                    state: initial_state,
                    version: Version::INITIAL,
                }),
                reducer,
                environment,
                journal,
            }
        }

        /// The journal stream this store writes to.
        #[must_use]
        pub const fn stream_id(&self) -> &StreamId {
            &self.stream_id
        }

        /// Submit a command.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Rejected`] when the reducer refuses the command
        /// - [`StoreError::Journal`] when the append fails
        /// - [`StoreError::Encoding`] when the fact cannot be encoded
        ///
        /// State is unchanged on every error.
        pub async fn send(&self, action: R::Action) -> Result<R::Event, StoreError<R::Error>> {
            self.send_with_metadata(action, None).await
        }

        /// Submit a command, attaching JSON metadata to the journaled fact.
        ///
        /// # Errors
        ///
        /// See [`Store::send`].
        #[tracing::instrument(skip_all, fields(stream = %self.stream_id))]
        pub async fn send_with_metadata(
            &self,
            action: R::Action,
            metadata: Option<serde_json::Value>,
        ) -> Result<R::Event, StoreError<R::Error>> {
            let started = Instant::now();
            let _writer = self.writer.lock().await;
            let current = self.committed.load_full();

            let event = match self
                .reducer
                .decide(&current.state, action, &self.environment)
            {
                Ok(event) => event,
                Err(rejection) => {
                    tracing::debug!(reason = %rejection, "Command rejected");
                    LedgerMetrics::record_command(
                        self.kind,
                        CommandOutcome::Rejected,
                        started.elapsed(),
                    );
                    return Err(StoreError::Rejected(rejection));
                },
            };

            let serialized = SerializedEvent::from_event(&event, metadata)?;
            let version = match self
                .journal
                .append_events(
                    self.stream_id.clone(),
                    Some(current.version),
                    vec![serialized],
                )
                .await
            {
                Ok(version) => version,
                Err(error) => {
                    tracing::error!(%error, "Journal append failed, state left unchanged");
                    LedgerMetrics::record_command(
                        self.kind,
                        CommandOutcome::Failed,
                        started.elapsed(),
                    );
                    return Err(error.into());
                },
            };

            let mut state = current.state.clone();
            self.reducer.apply(&mut state, &event);
            self.committed.store(Arc::new(Committed { state, version }));

            tracing::debug!(
                event_type = event.event_type(),
                version = %version,
                "Fact committed"
            );
            LedgerMetrics::record_command(self.kind, CommandOutcome::Committed, started.elapsed());
            Ok(event)
        }

        /// Read the last committed state via a closure.
        ///
        /// Never waits: the closure runs against the published snapshot.
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            let committed = self.committed.load();
            f(&committed.state)
        }

        /// Journal version the committed state reflects.
        #[must_use]
        pub fn version(&self) -> Version {
            self.committed.load().version
        }

        /// Fold any journaled facts past the current version into state.
        ///
        /// Returns how many facts were applied.
        ///
        /// # Errors
        ///
        /// Returns [`JournalError::Unavailable`] if the stream cannot be read, or
        /// [`JournalError::Corrupt`] if a stored fact cannot be decoded. Facts before
        /// the corrupt one stay applied.
        #[tracing::instrument(skip_all, fields(stream = %self.stream_id))]
        pub async fn hydrate(&self) -> Result<usize, JournalError> {
            let _writer = self.writer.lock().await;
            let current = self.committed.load_full();
            let facts = self
                .journal
                .load_events(self.stream_id.clone(), Some(current.version))
                .await?;

            let mut state = current.state.clone();
            let mut version = current.version;
            let mut outcome = Ok(facts.len());
            for stored in &facts {
                let position = version.next();
                match stored.decode::<R::Event>() {
                    Ok(event) => {
                        self.reducer.apply(&mut state, &event);
                        version = position;
                    },
                    Err(e) => {
                        outcome = Err(JournalError::Corrupt {
                            stream_id: self.stream_id.clone(),
                            version: position,
                            reason: e.to_string(),
                        });
                        break;
                    },
                }
            }

            if version != current.version {
                tracing::debug!(version = %version, "Store hydrated");
                self.committed.store(Arc::new(Committed { state, version }));
            }
            outcome
        }

        /// Report this store's stream and version.
        #[must_use]
        pub fn health(&self) -> HealthCheck {
            HealthCheck::healthy(self.kind)
                .with_metadata("stream", self.stream_id.as_str())
                .with_metadata("version", self.version().to_string())
        }
    }

    impl<R: Reducer> std::fmt::Debug for Store<R> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("kind", &self.kind)
                .field("stream_id", &self.stream_id)
                .finish_non_exhaustive()
        }
    }
}
