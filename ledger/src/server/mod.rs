//! HTTP server module for the club ticket ledger.
//!
//! This module provides the Axum-based HTTP server with:
//! - Application state management
//! - Journal selection (file or `PostgreSQL`)
//! - Health and readiness endpoints
//! - Graceful shutdown handling
//! - Router configuration

pub mod health;
pub mod journal;
pub mod routes;
pub mod state;

pub use health::readiness_check;
pub use journal::open_journal;
pub use routes::{build_router, metrics_router};
pub use state::AppState;

/// Resolve when the process receives Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
