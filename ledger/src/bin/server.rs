//! Club Ticket Ledger Server
//!
//! Serves the ledger over HTTP and exposes Prometheus metrics on a separate
//! listener.
//!
//! # Usage
//!
//! ```bash
//! LEDGER_ADDRESS=CAMPUSLEDGER cargo run --bin server
//!
//! # Journal to PostgreSQL instead of data/clubticket.journal
//! DATABASE_URL=postgres://localhost/clubticket cargo run --bin server
//! ```

use anyhow::Context;
use clubticket_core::environment::SystemClock;
use clubticket_ledger::server::{
    AppState, build_router, metrics_router, open_journal, shutdown_signal,
};
use clubticket_ledger::{Config, Ledger};
use clubticket_runtime::metrics::MetricsServer;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,clubticket_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting club ticket ledger server...");

    let config = Config::from_env().context("reading configuration")?;
    config.validate().context("validating configuration")?;
    let policy = config.ledger.policy()?;
    tracing::info!(
        ledger_address = %policy.ledger_address,
        max_tickets_per_event = policy.max_tickets_per_event,
        asset_id_base = policy.asset_id_base,
        "Configuration loaded"
    );

    // Metrics
    let mut metrics = MetricsServer::new(config.metrics_addr()?);
    metrics.start()?;
    let metrics_task = match metrics.handle().cloned() {
        Some(handle) => {
            let listener = tokio::net::TcpListener::bind(metrics.addr())
                .await
                .with_context(|| format!("binding metrics listener on {}", metrics.addr()))?;
            tracing::info!(address = %metrics.addr(), "Metrics listening");
            Some(tokio::spawn(async move {
                if let Err(error) = axum::serve(listener, metrics_router(handle)).await {
                    tracing::error!(%error, "Metrics server stopped");
                }
            }))
        },
        None => None,
    };

    // Ledger
    let journal = open_journal(&config.journal)
        .await
        .context("opening journal")?;
    let ledger = Ledger::restore(policy, journal, Arc::new(SystemClock))
        .await
        .context("restoring ledger from journal")?;
    let app = build_router(AppState::new(Arc::new(ledger)));

    let addr = config.server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(address = %addr, "Server listening");

    // Run server with graceful shutdown, bounded by the configured timeout
    let (stopping_tx, stopping_rx) = oneshot::channel::<()>();
    let serve = std::future::IntoFuture::into_future(axum::serve(listener, app).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = stopping_tx.send(());
        },
    ));
    let shutdown_timeout = config.server.shutdown_timeout();
    let deadline = async move {
        if stopping_rx.await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = serve => result.context("serving HTTP")?,
        () = deadline => {
            tracing::warn!(?shutdown_timeout, "In-flight requests did not finish before the shutdown timeout");
        },
    }

    if let Some(task) = metrics_task {
        task.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}
