use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use tickethub_core::event::{Comment, NewComment};

use crate::error::AppError;
use crate::events::{internal, invalid_json, map_store_error, require_field, PageQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/event/comments/{event_id}",
            get(list_comments).post(create_comment),
        )
        .route("/api/event/comments/amount/{event_id}", get(comment_count))
}

/// POST /api/event/comments/:id
async fn create_comment(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|_| invalid_json())?;

    require_field(&body, "username")?;
    require_field(&body, "content")?;
    let comment: NewComment =
        serde_json::from_value(body).map_err(|e| AppError::ValidationError(e.to_string()))?;

    let id = Uuid::parse_str(&event_id)
        .map_err(|_| AppError::NotFoundError("Event not found".to_string()))?;
    let found = state
        .repo
        .add_comment(id, comment)
        .await
        .map_err(map_store_error)?;
    if !found {
        return Err(AppError::NotFoundError("Event not found".to_string()));
    }

    Ok((StatusCode::CREATED, "Comment created successfully"))
}

/// GET /api/event/comments/:id
///
/// Unknown ids read as an event with no comments, so the response is an
/// empty list rather than a 404.
async fn list_comments(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = match Uuid::parse_str(&event_id) {
        Ok(id) => state
            .repo
            .list_comments(id, query.page())
            .await
            .map_err(internal)?,
        Err(_) => Vec::new(),
    };
    Ok(Json(comments))
}

/// GET /api/event/comments/amount/:id
async fn comment_count(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let count = match Uuid::parse_str(&event_id) {
        Ok(id) => state.repo.comment_count(id).await.map_err(internal)?,
        Err(_) => 0,
    };
    Ok(Json(json!({ "commentsCount": count })))
}
