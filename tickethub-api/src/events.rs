use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use tickethub_core::event::{Event, EventPatch, NewEvent, ValidationError};
use tickethub_core::repository::Page;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/event", get(list_events).post(create_event))
        .route("/api/event/available", get(available_events))
        .route("/api/event/date", post(closest_event))
        .route("/api/event/{event_id}", get(get_event).put(update_event))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub(crate) fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

/// Required-field check: absent, null, empty string, zero and false all
/// count as missing.
pub(crate) fn require_field<'a>(body: &'a Value, field: &str) -> Result<&'a Value, AppError> {
    let Some(value) = body.get(field) else {
        return Err(missing_field(field));
    };
    let missing = match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    };
    if missing {
        return Err(missing_field(field));
    }
    Ok(value)
}

fn missing_field(field: &str) -> AppError {
    AppError::ValidationError(format!("Missing required field: {}", field))
}

pub(crate) fn invalid_json() -> AppError {
    AppError::ValidationError("Invalid JSON format in request body.".to_string())
}

pub(crate) fn internal(err: Box<dyn std::error::Error + Send + Sync>) -> AppError {
    AppError::Anyhow(anyhow::anyhow!(err))
}

/// Validation failures surfaced through the repository boundary become 400s;
/// anything else is an internal error.
pub(crate) fn map_store_error(err: Box<dyn std::error::Error + Send + Sync>) -> AppError {
    match err.downcast::<ValidationError>() {
        Ok(validation) => AppError::ValidationError(validation.to_string()),
        Err(err) => internal(err),
    }
}

const EVENT_REQUIRED_FIELDS: &[&str] = &[
    "title",
    "category",
    "description",
    "organizer",
    "start_date",
    "end_date",
    "location",
    "tickets",
];

/// GET /api/event
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.repo.list_events(query.page()).await.map_err(internal)?;
    Ok(Json(events))
}

/// GET /api/event/available
async fn available_events(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state
        .repo
        .list_available_events(query.page())
        .await
        .map_err(internal)?;
    Ok(Json(events))
}

/// GET /api/event/:id
async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, AppError> {
    let id = Uuid::parse_str(&event_id)
        .map_err(|_| AppError::NotFoundError("Event not found".to_string()))?;
    let event = state
        .repo
        .get_event(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::NotFoundError("Event not found".to_string()))?;
    Ok(Json(event))
}

/// POST /api/event
async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|_| invalid_json())?;

    for &field in EVENT_REQUIRED_FIELDS {
        require_field(&body, field)?;
    }

    let event: NewEvent =
        serde_json::from_value(body).map_err(|e| AppError::ValidationError(e.to_string()))?;
    event
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let id = state.repo.create_event(&event).await.map_err(map_store_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "_id": id }))))
}

/// PUT /api/event/:id
async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|_| invalid_json())?;

    // An empty body is a no-op, not an error.
    if body.as_object().is_some_and(|o| o.is_empty()) {
        return Ok(StatusCode::OK.into_response());
    }

    let patch: EventPatch =
        serde_json::from_value(body).map_err(|e| AppError::ValidationError(e.to_string()))?;
    patch
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let id = Uuid::parse_str(&event_id)
        .map_err(|_| AppError::NotFoundError("event does not exist.".to_string()))?;
    let found = state
        .repo
        .update_event_fields(id, patch)
        .await
        .map_err(map_store_error)?;
    if !found {
        return Err(AppError::NotFoundError("event does not exist.".to_string()));
    }

    Ok((StatusCode::OK, Json(json!({ "_id": id }))).into_response())
}

/// POST /api/event/date
async fn closest_event(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Event>, AppError> {
    let Json(body) = body.map_err(|_| invalid_json())?;
    let ids_value = require_field(&body, "eventIDs")?;

    let raw_ids: Vec<String> = serde_json::from_value(ids_value.clone())
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    let mut ids = Vec::with_capacity(raw_ids.len());
    for raw in &raw_ids {
        let id = Uuid::parse_str(raw)
            .map_err(|_| AppError::ValidationError(format!("invalid event id: {}", raw)))?;
        ids.push(id);
    }

    let event = state
        .repo
        .closest_upcoming_event(&ids)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::NotFoundError("No events found for the provided IDs.".to_string())
        })?;
    Ok(Json(event))
}
