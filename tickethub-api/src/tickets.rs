use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use tickethub_core::repository::TicketUpdateError;

use crate::error::AppError;
use crate::events::{internal, invalid_json, require_field};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/event/tickets/{event_id}", put(update_ticket))
        .route("/api/event/tickets/price/{event_id}", get(minimum_ticket_price))
        .route("/api/event/tickets/amount/{event_id}", get(total_ticket_quantity))
}

/// PUT /api/event/tickets/:id
///
/// The synchronous half of the inventory write path: sellers push negative
/// deltas, manual restocks push positive ones. The refund consumer is the
/// other caller of the same repository operation.
async fn update_ticket(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|_| invalid_json())?;

    let ticket_type = require_field(&body, "ticketType")?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| AppError::ValidationError("ticketType must be a string".to_string()))?;
    // A zero amount fails the required-field check, same as an absent one.
    let amount = require_field(&body, "amount")?
        .as_i64()
        .ok_or_else(|| AppError::ValidationError("amount must be an integer".to_string()))?;

    let id = Uuid::parse_str(&event_id)
        .map_err(|_| AppError::NotFoundError("Event not found".to_string()))?;

    match state
        .repo
        .adjust_ticket_quantity(id, &ticket_type, amount, None)
        .await
    {
        Ok(_) => Ok((StatusCode::OK, "Ticket updated successfully")),
        Err(TicketUpdateError::EventNotFound) => {
            Err(AppError::NotFoundError("Event not found".to_string()))
        }
        Err(TicketUpdateError::TicketTypeNotFound(_)) => {
            Err(AppError::NotFoundError("Ticket not found".to_string()))
        }
        Err(TicketUpdateError::InsufficientInventory { .. }) => {
            Err(AppError::ValidationError("There isn't enough tickets".to_string()))
        }
        Err(err @ TicketUpdateError::Conflict) => {
            Err(AppError::InternalServerError(err.to_string()))
        }
        Err(TicketUpdateError::Store(err)) => {
            Err(AppError::InternalServerError(err.to_string()))
        }
    }
}

/// GET /api/event/tickets/price/:id
async fn minimum_ticket_price(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let not_found = || AppError::NotFoundError("there are no available tickets".to_string());

    let id = Uuid::parse_str(&event_id).map_err(|_| not_found())?;
    let min_price = state
        .repo
        .minimum_ticket_price(id)
        .await
        .map_err(internal)?
        .ok_or_else(not_found)?;
    Ok(Json(json!({ "minPrice": min_price })))
}

/// GET /api/event/tickets/amount/:id
async fn total_ticket_quantity(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let total = match Uuid::parse_str(&event_id) {
        Ok(id) => state
            .repo
            .total_ticket_quantity(id)
            .await
            .map_err(internal)?,
        Err(_) => 0,
    };
    Ok(Json(json!({ "totalTicketsAmount": total })))
}
