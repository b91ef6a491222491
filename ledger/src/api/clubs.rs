//! Club registry API endpoints.
//!
//! - POST /api/clubs - Register the caller as a club
//! - GET /api/clubs/:address - Get a club's name
//! - GET /api/clubs/:address/registered - Check whether an address is a club

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use clubticket_web::{AppError, Caller};
use serde::{Deserialize, Serialize};

use super::{call_context, parse_address};
use crate::server::state::AppState;
use crate::types::Address;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to register a club.
#[derive(Debug, Deserialize)]
pub struct RegisterClubRequest {
    /// Club name
    pub name: String,
    /// Contact details
    pub contact: String,
}

/// A registered club.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClubResponse {
    /// Owner address
    pub owner: Address,
    /// Club name
    pub name: String,
    /// Contact details
    pub contact: String,
}

/// A club's name.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClubNameResponse {
    /// Owner address
    pub address: Address,
    /// Club name
    pub name: String,
}

/// Registration status of an address.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Queried address
    pub address: Address,
    /// Whether it registered a club
    pub registered: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register the caller as a club.
///
/// # Errors
///
/// - 409 `ALREADY_REGISTERED` if the caller already registered
/// - 422 `INVALID_INPUT` for an empty or overlong field
pub async fn register_club(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<RegisterClubRequest>,
) -> Result<(StatusCode, Json<ClubResponse>), AppError> {
    let ctx = call_context(&caller)?;
    let club = state
        .ledger
        .register_club(&ctx, &request.name, &request.contact)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ClubResponse {
            owner: club.owner,
            name: club.name,
            contact: club.contact,
        }),
    ))
}

/// Get the name of the club registered by `address`.
///
/// # Errors
///
/// - 404 `NOT_FOUND` if no club is registered there
pub async fn get_club_name(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ClubNameResponse>, AppError> {
    let address = parse_address(&address)?;
    let name = state
        .ledger
        .get_club_name(&address)
        .ok_or_else(|| AppError::not_found("club", &address))?;

    Ok(Json(ClubNameResponse { address, name }))
}

/// Check whether `address` registered a club.
///
/// # Errors
///
/// - 422 `INVALID_INPUT` for a malformed address
pub async fn is_club_registered(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let address = parse_address(&address)?;
    let registered = state.ledger.is_club_registered(&address);

    Ok(Json(RegistrationResponse {
        address,
        registered,
    }))
}
