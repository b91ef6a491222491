//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, http::StatusCode};
use clubticket_runtime::{HealthReport, HealthStatus};

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running. Does not inspect
/// any component.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Render a readiness report.
///
/// # Status Codes
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
#[must_use]
pub fn readiness_response(report: HealthReport) -> (StatusCode, Json<HealthReport>) {
    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubticket_runtime::HealthCheck;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[test]
    fn test_healthy_report_is_ok() {
        let report = HealthReport::new(vec![HealthCheck::healthy("clubs")]);
        let (status, Json(body)) = readiness_response(report);
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_healthy());
    }

    #[test]
    fn test_unhealthy_report_is_unavailable() {
        let report = HealthReport::new(vec![
            HealthCheck::healthy("clubs"),
            HealthCheck::unhealthy("journal", "refusing writes"),
        ]);
        let (status, _) = readiness_response(report);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
