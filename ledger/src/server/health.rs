//! Readiness endpoint for the ledger.

use axum::{Json, extract::State, http::StatusCode};
use clubticket_runtime::HealthReport;
use clubticket_web::handlers::readiness_response;

use super::state::AppState;

/// Readiness check endpoint.
///
/// Reports every registry stream with its journal version.
///
/// ```bash
/// curl http://localhost:8080/ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    readiness_response(state.ledger.health())
}
