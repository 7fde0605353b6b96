use axum::{response::Html, routing::get, Router};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(main_route))
}

async fn main_route() -> Html<&'static str> {
    Html(
        r#"<h1>Events API Documentation</h1>
<ul>
    <li>GET /api/event - Get all events.</li>
    <li>GET /api/event/{id} - Get event by id.</li>
    <li>GET /api/event/available - Get all events with available tickets.</li>
    <li>GET /api/event/comments/{id} - Get comments for the event (by event ID).</li>
    <li>GET /api/event/comments/amount/{id} - Get the number of comments for the event (by event ID).</li>
    <li>GET /api/event/tickets/amount/{id} - Get the number of tickets for the event (by event ID).</li>
    <li>GET /api/event/tickets/price/{id} - Get the tickets' minimum price for the event (by event ID).</li>
    <li>POST /api/event/date - Get the event with the closest start date.</li>
    <li>POST /api/event - Create a new event.</li>
    <li>POST /api/event/comments/{id} - Create a new comment for the event (by event ID).</li>
    <li>PUT /api/event/{id} - Update event fields (by event ID).</li>
    <li>PUT /api/event/tickets/{id} - Update event tickets (by event ID).</li>
</ul>"#,
    )
}
