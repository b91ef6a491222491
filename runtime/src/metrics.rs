//! Prometheus metrics for the ledger.
//!
//! Metrics recorded here:
//! - Commands submitted to each store, by outcome
//! - Rejections, by error kind
//! - Tickets issued and events created
//! - Time spent inside a store's write section
//!
//! # Example
//!
//! ```rust,no_run
//! use clubticket_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Serve `server.render()` from an HTTP handler for Prometheus to scrape.
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the scrape endpoint will be bound to
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should listen on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe the ledger metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built. A recorder that is already
    /// installed (several servers in one test binary) is logged and tolerated.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5,
                    1.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(BuildError::FailedToSetGlobalRecorder(_)) => {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(())
            }
            Err(e) => Err(MetricsError::Install(e.to_string())),
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "ledger_commands_total",
        "Commands submitted to a store, labelled by stream kind and outcome"
    );
    describe_counter!(
        "ledger_rejections_total",
        "Commands rejected by validation, labelled by error kind"
    );
    describe_counter!(
        "ledger_tickets_issued_total",
        "Tickets issued across all events"
    );
    describe_gauge!("ledger_events_total", "Events created so far");
    describe_histogram!(
        "ledger_command_duration_seconds",
        "Time spent deciding, journaling and applying one command"
    );
}

/// Outcome label for `ledger_commands_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Fact journaled and applied
    Committed,
    /// Validation refused the command
    Rejected,
    /// The journal refused the write
    Failed,
}

impl CommandOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Recorder for ledger metrics.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record one command handled by a store.
    pub fn record_command(stream: &'static str, outcome: CommandOutcome, duration: Duration) {
        counter!("ledger_commands_total", "stream" => stream, "outcome" => outcome.as_str())
            .increment(1);
        histogram!("ledger_command_duration_seconds", "stream" => stream)
            .record(duration.as_secs_f64());
    }

    /// Record a rejection by error kind (`SOLD_OUT`, `PAYMENT_MISMATCH`, ...).
    pub fn record_rejection(kind: &'static str) {
        counter!("ledger_rejections_total", "kind" => kind).increment(1);
    }

    /// Record an issued ticket.
    pub fn record_ticket_issued() {
        counter!("ledger_tickets_issued_total").increment(1);
    }

    /// Set the number of events created.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_event_count(total: u64) {
        gauge!("ledger_events_total").set(total as f64);
    }
}
