use axum::{
    http::{Method, StatusCode},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod comments;
pub mod consumer;
pub mod docs;
pub mod error;
pub mod events;
pub mod state;
pub mod tickets;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .merge(docs::routes())
        .merge(events::routes())
        .merge(tickets::routes())
        .merge(comments::routes())
        .fallback(|| async { (StatusCode::NOT_FOUND, "Route does not exist") })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
