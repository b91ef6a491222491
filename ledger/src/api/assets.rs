//! Ticket asset API endpoints.
//!
//! - POST /api/assets/:id/opt-in - Opt the caller in to a ticket asset
//! - GET /api/assets/:id - Asset parameters and remaining reserve
//! - GET /api/assets/:id/balances/:address - A holder's balance

use axum::{
    Json,
    extract::{Path, State},
};
use clubticket_web::{AppError, Caller};
use serde::{Deserialize, Serialize};

use super::{call_context, parse_address};
use crate::server::state::AppState;
use crate::types::{Address, AssetId, EventId, TicketAssetParams};

/// Outcome of an opt-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct OptInResponse {
    /// Asset opted in to
    pub asset_id: AssetId,
    /// Account that opted in
    pub holder: Address,
    /// Always true once the call succeeds
    pub opted_in: bool,
}

/// Ticket asset parameters with live supply figures.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetResponse {
    /// Fixed parameters
    #[serde(flatten)]
    pub params: TicketAssetParams,
    /// Event that minted the asset
    pub event_id: EventId,
    /// Units still held by the ledger
    pub reserve: u64,
}

/// A holder's balance of one asset.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Asset queried
    pub asset_id: AssetId,
    /// Holder queried
    pub holder: Address,
    /// Whether the holder opted in
    pub opted_in: bool,
    /// Units held; absent if the holder never opted in
    pub balance: Option<u64>,
}

/// Opt the caller in to `asset_id`. Repeating it is harmless.
///
/// # Errors
///
/// - 404 `ASSET_NOT_FOUND` if no event minted the asset
pub async fn opt_in(
    State(state): State<AppState>,
    Path(asset_id): Path<u64>,
    caller: Caller,
) -> Result<Json<OptInResponse>, AppError> {
    let ctx = call_context(&caller)?;
    let asset_id = AssetId::new(asset_id);
    state.ledger.opt_in(asset_id, &ctx).await?;

    Ok(Json(OptInResponse {
        asset_id,
        holder: ctx.caller,
        opted_in: true,
    }))
}

/// Parameters of a ticket asset.
///
/// # Errors
///
/// - 404 `NOT_FOUND` if no event minted the asset
pub async fn get_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<u64>,
) -> Result<Json<AssetResponse>, AppError> {
    let asset_id = AssetId::new(asset_id);
    let ledger = &state.ledger;

    let (Some(params), Some(event_id)) = (
        ledger.get_asset_params(asset_id),
        ledger.event_for_asset(asset_id),
    ) else {
        return Err(AppError::not_found("asset", asset_id));
    };
    let reserve = ledger.asset_reserve(asset_id)?;

    Ok(Json(AssetResponse {
        params,
        event_id,
        reserve,
    }))
}

/// Balance of `address` in `asset_id`.
///
/// # Errors
///
/// - 404 `ASSET_NOT_FOUND` if no event minted the asset
/// - 422 `INVALID_INPUT` for a malformed address
pub async fn get_balance(
    State(state): State<AppState>,
    Path((asset_id, address)): Path<(u64, String)>,
) -> Result<Json<BalanceResponse>, AppError> {
    let asset_id = AssetId::new(asset_id);
    let holder = parse_address(&address)?;
    let balance = state.ledger.asset_balance(asset_id, &holder)?;

    Ok(Json(BalanceResponse {
        asset_id,
        holder,
        opted_in: balance.is_some(),
        balance,
    }))
}
