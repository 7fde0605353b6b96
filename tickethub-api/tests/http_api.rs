use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tickethub_api::{app, AppState};
use tickethub_core::event::{Category, Event, Ticket};
use tickethub_core::testing::InMemoryEventRepository;

fn seeded_event(tickets: Vec<(&str, i64, f64)>) -> Event {
    let start = Utc::now() + Duration::days(14);
    Event {
        id: Uuid::new_v4(),
        title: "Rust Nation".to_string(),
        category: Category::Conference,
        description: "Two days of talks".to_string(),
        organizer: "Rust Nation Ltd".to_string(),
        start_date: start,
        end_date: start + Duration::days(2),
        location: "London".to_string(),
        tickets: tickets
            .into_iter()
            .map(|(name, quantity, price)| Ticket {
                name: name.to_string(),
                quantity,
                initial_quantity: quantity,
                price,
            })
            .collect(),
        image: None,
        comments: Vec::new(),
    }
}

fn test_app() -> (axum::Router, Arc<InMemoryEventRepository>) {
    let repo = Arc::new(InMemoryEventRepository::new());
    let state = AppState { repo: repo.clone() };
    (app(state), repo)
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn ticket_update_applies_negative_delta() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("VIP", 5, 100.0)]));

    let response = app
        .oneshot(put_json(
            &format!("/api/event/tickets/{id}"),
            json!({ "ticketType": "VIP", "amount": -3 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Ticket updated successfully");
    assert_eq!(repo.event(id).unwrap().tickets[0].quantity, 2);
}

#[tokio::test]
async fn ticket_update_rejects_overdraw_without_writing() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("VIP", 5, 100.0)]));

    let response = app
        .oneshot(put_json(
            &format!("/api/event/tickets/{id}"),
            json!({ "ticketType": "VIP", "amount": -10 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "There isn't enough tickets");
    assert_eq!(repo.event(id).unwrap().tickets[0].quantity, 5);
}

#[tokio::test]
async fn ticket_update_404s_on_unknown_ticket_type() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("VIP", 5, 100.0)]));

    let response = app
        .oneshot(put_json(
            &format!("/api/event/tickets/{id}"),
            json!({ "ticketType": "GA", "amount": -1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Ticket not found");
}

#[tokio::test]
async fn ticket_update_404s_on_unknown_event() {
    let (app, _repo) = test_app();

    let response = app
        .oneshot(put_json(
            &format!("/api/event/tickets/{}", Uuid::new_v4()),
            json!({ "ticketType": "VIP", "amount": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Event not found");
}

#[tokio::test]
async fn ticket_update_treats_zero_amount_as_missing() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("VIP", 5, 100.0)]));

    let response = app
        .oneshot(put_json(
            &format!("/api/event/tickets/{id}"),
            json!({ "ticketType": "VIP", "amount": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "Missing required field: amount");
}

#[tokio::test]
async fn ticket_update_reports_missing_ticket_type() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("VIP", 5, 100.0)]));

    let response = app
        .oneshot(put_json(
            &format!("/api/event/tickets/{id}"),
            json!({ "amount": 2 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "Missing required field: ticketType"
    );
}

#[tokio::test]
async fn ticket_update_rejects_malformed_json_as_bad_request() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("VIP", 5, 100.0)]));

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/event/tickets/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "Invalid JSON format in request body."
    );
}

#[tokio::test]
async fn create_event_round_trips() {
    let (app, repo) = test_app();
    let start = Utc::now() + Duration::days(30);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/event",
            json!({
                "title": "Winter Expo",
                "category": "Exhibition",
                "description": "Annual showcase",
                "organizer": "Expo Org",
                "start_date": start.to_rfc3339(),
                "end_date": (start + Duration::days(3)).to_rfc3339(),
                "location": "Hall 4",
                "tickets": [{ "name": "GA", "quantity": 200, "price": 10.0 }],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id: Uuid = serde_json::from_value(body["_id"].clone()).unwrap();

    let stored = repo.event(id).unwrap();
    assert_eq!(stored.tickets[0].initial_quantity, 200);

    let response = app.oneshot(get(&format!("/api/event/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["title"], "Winter Expo");
    assert_eq!(fetched["category"], "Exhibition");
}

#[tokio::test]
async fn create_event_reports_first_missing_field() {
    let (app, _repo) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/event",
            json!({ "title": "No category", "description": "x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        "Missing required field: category"
    );
}

#[tokio::test]
async fn create_event_rejects_duplicate_ticket_names() {
    let (app, _repo) = test_app();
    let start = Utc::now() + Duration::days(30);

    let response = app
        .oneshot(post_json(
            "/api/event",
            json!({
                "title": "Dup",
                "category": "Concert",
                "description": "x",
                "organizer": "x",
                "start_date": start.to_rfc3339(),
                "end_date": (start + Duration::days(1)).to_rfc3339(),
                "location": "x",
                "tickets": [
                    { "name": "GA", "quantity": 10, "price": 10.0 },
                    { "name": "GA", "quantity": 5, "price": 20.0 },
                ],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "Duplicate ticket name: GA");
}

#[tokio::test]
async fn get_event_404s_on_unknown_or_malformed_id() {
    let (app, _repo) = test_app();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/event/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/event/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ticket_amount_sums_all_types() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("GA", 40, 10.0), ("VIP", 8, 50.0)]));

    let response = app
        .oneshot(get(&format!("/api/event/tickets/amount/{id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "totalTicketsAmount": 48 }));
}

#[tokio::test]
async fn minimum_price_skips_sold_out_types() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("GA", 0, 10.0), ("VIP", 3, 50.0)]));

    let response = app
        .clone()
        .oneshot(get(&format!("/api/event/tickets/price/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "minPrice": 50.0 }));

    // Everything sold out reads as no available tickets.
    let sold_out = repo.insert(seeded_event(vec![("GA", 0, 10.0)]));
    let response = app
        .oneshot(get(&format!("/api/event/tickets/price/{sold_out}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "there are no available tickets");
}

#[tokio::test]
async fn comments_are_added_counted_and_listed() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("GA", 10, 10.0)]));

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/event/comments/{id}"),
            json!({ "username": "ana", "content": "see you there" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_string(response).await, "Comment created successfully");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/event/comments/amount/{id}")))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({ "commentsCount": 1 }));

    let response = app
        .oneshot(get(&format!("/api/event/comments/{id}")))
        .await
        .unwrap();
    let comments = body_json(response).await;
    assert_eq!(comments[0]["username"], "ana");
    assert_eq!(comments[0]["content"], "see you there");
}

#[tokio::test]
async fn comment_requires_username_and_content() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("GA", 10, 10.0)]));

    let response = app
        .oneshot(post_json(
            &format!("/api/event/comments/{id}"),
            json!({ "username": "ana" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "Missing required field: content");
}

#[tokio::test]
async fn closest_event_picks_earliest_future_start() {
    let (app, repo) = test_app();
    let mut soon = seeded_event(vec![("GA", 10, 10.0)]);
    soon.start_date = Utc::now() + Duration::days(2);
    soon.end_date = soon.start_date + Duration::days(1);
    let mut later = seeded_event(vec![("GA", 10, 10.0)]);
    later.start_date = Utc::now() + Duration::days(20);
    later.end_date = later.start_date + Duration::days(1);
    let soon_id = repo.insert(soon);
    let later_id = repo.insert(later);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/event/date",
            json!({ "eventIDs": [soon_id.to_string(), later_id.to_string()] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], json!(soon_id));

    let response = app
        .oneshot(post_json("/api/event/date", json!({ "eventIDs": [] })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_event_patches_fields() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("GA", 10, 10.0)]));

    let response = app
        .clone()
        .oneshot(put_json(
            &format!("/api/event/{id}"),
            json!({ "title": "Renamed", "location": "Manchester" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "_id": id }));

    let stored = repo.event(id).unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.location, "Manchester");

    // Unknown event id
    let response = app
        .oneshot(put_json(
            &format!("/api/event/{}", Uuid::new_v4()),
            json!({ "title": "Ghost" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "event does not exist.");
}

#[tokio::test]
async fn update_event_rejects_empty_required_strings() {
    let (app, repo) = test_app();
    let id = repo.insert(seeded_event(vec![("GA", 10, 10.0)]));

    let response = app
        .oneshot(put_json(&format!("/api/event/{id}"), json!({ "title": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repo.event(id).unwrap().title, "Rust Nation");
}

#[tokio::test]
async fn available_events_excludes_sold_out_and_past() {
    let (app, repo) = test_app();
    let upcoming = repo.insert(seeded_event(vec![("GA", 5, 10.0)]));
    let _sold_out = repo.insert(seeded_event(vec![("GA", 0, 10.0)]));
    let mut past = seeded_event(vec![("GA", 5, 10.0)]);
    past.start_date = Utc::now() - Duration::days(10);
    past.end_date = past.start_date + Duration::days(1);
    repo.insert(past);

    let response = app.oneshot(get("/api/event/available")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let listed: Vec<Value> = body.as_array().unwrap().clone();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], json!(upcoming));
}

#[tokio::test]
async fn unknown_routes_get_the_catch_all_body() {
    let (app, _repo) = test_app();

    let response = app.oneshot(get("/api/somewhere/else")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Route does not exist");
}
