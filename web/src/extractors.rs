//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation ID
//! - `Caller`: the account submitting the request, from `X-Caller-Address`
//!
//! # Examples
//!
//! ```ignore
//! use clubticket_web::extractors::{Caller, CorrelationId};
//!
//! async fn handler(caller: Caller, correlation_id: CorrelationId) -> String {
//!     format!("{} ({})", caller.0, correlation_id.0)
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header naming the account that submits a request.
pub const CALLER_HEADER: &str = "X-Caller-Address";

/// Correlation ID for request tracing.
///
/// Uses the ID stored by [`correlation_id_layer`](crate::middleware::correlation_id_layer)
/// when the layer is installed, otherwise the `X-Correlation-ID` header, otherwise a
/// fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The account submitting a request, as sent in `X-Caller-Address`.
///
/// Only presence is checked here; address syntax is validated by the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self(s.to_string()))
            .ok_or_else(|| {
                AppError::unauthorized(format!("{CALLER_HEADER} header is required"))
                    .with_code("MISSING_CALLER")
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .unwrap();

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .unwrap();
        req.extensions_mut().insert(CorrelationId(stored));

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_caller_from_header() {
        let req = Request::builder()
            .header(CALLER_HEADER, " MLSCOWNER ")
            .body(())
            .unwrap();

        let (mut parts, ()) = req.into_parts();
        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(caller, Caller("MLSCOWNER".to_string()));
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();

        let (mut parts, ()) = req.into_parts();
        let err = Caller::from_request_parts(&mut parts, &()).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "MISSING_CALLER");
    }
}
