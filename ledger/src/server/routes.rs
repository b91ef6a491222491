//! Router configuration for the club ticket ledger.

use axum::{
    Router,
    routing::{get, post},
};
use clubticket_web::correlation_id_layer;
use clubticket_web::handlers::health_check;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{assets, clubs, events};

/// Build the complete Axum router.
///
/// - `/health` and `/ready` for liveness and readiness checks
/// - `/api/clubs`, `/api/events` and `/api/assets` for ledger calls
///
/// Every request gets a correlation ID and a trace span.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Club registry
        .route("/clubs", post(clubs::register_club))
        .route("/clubs/:address", get(clubs::get_club_name))
        .route("/clubs/:address/registered", get(clubs::is_club_registered))
        // Event registry and ticket issuance
        .route("/events", post(events::create_event))
        .route("/events/count", get(events::get_total_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/tickets", post(events::buy_ticket))
        .route("/events/:id/holders/:address", get(events::verify_ticket))
        // Ticket assets
        .route("/assets/:id", get(assets::get_asset))
        .route("/assets/:id/opt-in", post(assets::opt_in))
        .route("/assets/:id/balances/:address", get(assets::get_balance));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router serving `/metrics` in Prometheus text format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}
