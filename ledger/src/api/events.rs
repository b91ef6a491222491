//! Event and ticket API endpoints.
//!
//! - POST /api/events - Create an event (caller must be a club)
//! - GET /api/events/count - Number of events created
//! - GET /api/events/:id - Event details
//! - POST /api/events/:id/tickets - Buy one ticket
//! - GET /api/events/:id/holders/:address - Verify a ticket holder

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use clubticket_web::{AppError, Caller};
use serde::{Deserialize, Serialize};

use super::{call_context, parse_address};
use crate::server::state::AppState;
use crate::types::{Address, Amount, AssetId, EventDetails, EventId, NewEvent, Payment, TicketReceipt};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create an event.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    /// Event name
    pub name: String,
    /// Venue
    pub venue: String,
    /// Start time, unix seconds
    pub event_date: u64,
    /// Price of one ticket
    pub ticket_price: u64,
    /// Ticket supply
    pub total_tickets: u64,
}

/// Response after creating an event.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEventResponse {
    /// New event id
    pub event_id: EventId,
    /// Minted ticket asset
    pub asset_id: AssetId,
}

/// Number of events created.
#[derive(Debug, Serialize, Deserialize)]
pub struct TotalEventsResponse {
    /// Events created so far
    pub total_events: u64,
}

/// Payment attached to a purchase.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    /// Paying account
    pub sender: String,
    /// Receiving account
    pub receiver: String,
    /// Amount transferred
    pub amount: u64,
}

/// Request to buy a ticket.
#[derive(Debug, Default, Deserialize)]
pub struct BuyTicketRequest {
    /// Payment bound to this purchase
    #[serde(default)]
    pub payment: Option<PaymentRequest>,
}

/// Result of a ticket verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationResponse {
    /// Event checked
    pub event_id: EventId,
    /// Holder checked
    pub holder: Address,
    /// Whether the holder has a ticket
    pub valid: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an event owned by the caller.
///
/// # Errors
///
/// - 403 `CLUB_NOT_REGISTERED` if the caller is not a club
/// - 422 for a past date, zero price, bad quantity or invalid text
pub async fn create_event(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let ctx = call_context(&caller)?;
    let event_id = state
        .ledger
        .create_event(
            &ctx,
            NewEvent {
                name: request.name,
                venue: request.venue,
                event_date: request.event_date,
                ticket_price: Amount::new(request.ticket_price),
                total_tickets: request.total_tickets,
            },
        )
        .await?;

    let details = state
        .ledger
        .get_event_details(event_id)
        .ok_or_else(|| AppError::internal(format!("event {event_id} missing after creation")))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            event_id,
            asset_id: details.asset_id,
        }),
    ))
}

/// Number of events created so far.
pub async fn get_total_events(State(state): State<AppState>) -> Json<TotalEventsResponse> {
    Json(TotalEventsResponse {
        total_events: state.ledger.get_total_events(),
    })
}

/// Details of one event.
///
/// # Errors
///
/// - 404 `NOT_FOUND` if the event does not exist
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
) -> Result<Json<EventDetails>, AppError> {
    let event_id = EventId::new(event_id);
    state
        .ledger
        .get_event_details(event_id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("event", event_id))
}

/// Buy one ticket for the caller.
///
/// # Errors
///
/// - 404 `EVENT_NOT_FOUND` if the event does not exist
/// - 402 `PAYMENT_MISMATCH` if the payment is absent or wrong
/// - 409 `SOLD_OUT` if no tickets remain
/// - 403 `NOT_OPTED_IN` if the caller has not opted in to the ticket asset
pub async fn buy_ticket(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
    caller: Caller,
    Json(request): Json<BuyTicketRequest>,
) -> Result<(StatusCode, Json<TicketReceipt>), AppError> {
    let mut ctx = call_context(&caller)?;
    if let Some(payment) = request.payment {
        ctx = ctx.with_payment(Payment {
            sender: parse_address(&payment.sender)?,
            receiver: parse_address(&payment.receiver)?,
            amount: Amount::new(payment.amount),
        });
    }

    let receipt = state
        .ledger
        .buy_ticket(EventId::new(event_id), &ctx)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Whether `address` holds a ticket for the event.
///
/// An unknown event answers `valid: false`.
///
/// # Errors
///
/// - 422 `INVALID_INPUT` for a malformed address
pub async fn verify_ticket(
    State(state): State<AppState>,
    Path((event_id, address)): Path<(u64, String)>,
) -> Result<Json<VerificationResponse>, AppError> {
    let event_id = EventId::new(event_id);
    let holder = parse_address(&address)?;
    let valid = state.ledger.verify_ticket(event_id, &holder);

    Ok(Json(VerificationResponse {
        event_id,
        holder,
        valid,
    }))
}
