//! A full user journey over HTTP against the in-memory deployment.

mod common;

use std::sync::Arc;
use std::time::Duration;

use api_adapters::web::{router, AppState};
use api_adapters::HttpMetrics;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{uid, Harness, Person};
use domains::{DomainEvent, Gender};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(harness: &Harness) -> Router {
    router(
        AppState {
            matching: harness.node().matching,
            conversations: harness.conversations(),
            metrics: Arc::new(HttpMetrics::new()),
        },
        Duration::from_secs(5),
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn discover_match_and_chat() {
    let harness = Harness::new(&[
        Person::new(1, Gender::Male, Gender::Female),
        Person::new(2, Gender::Female, Gender::Male),
    ]);
    let app = app(&harness);
    let (alex, sam) = (uid(1).to_string(), uid(2).to_string());

    let (status, profile) = send(
        &app,
        "PUT",
        &format!("/api/users/{sam}/profile"),
        Some(json!({ "bio": "coffee first", "preferred_gender": "male" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["bio"], "coffee first");

    let (status, deck) = send(
        &app,
        "POST",
        "/api/recommendations",
        Some(json!({ "user_id": alex, "count": 5, "max_distance_km": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deck[0]["id"], sam.as_str());
    assert_eq!(deck[0]["photo_urls"][0], "https://cdn.example/2.jpg");

    let like = |from: &str, to: &str| json!({ "from_user": from, "to_user": to, "liked": true });
    let (_, pending) = send(&app, "POST", "/api/swipes", Some(like(&alex, &sam))).await;
    assert_eq!(pending["is_match"], false);
    let (_, matched) = send(&app, "POST", "/api/swipes", Some(like(&sam, &alex))).await;
    assert_eq!(matched["is_match"], true);
    let match_id = matched["match_id"].as_str().unwrap().to_string();

    let (_, decision) = send(&app, "GET", &format!("/api/swipes/{sam}/{alex}"), None).await;
    assert_eq!(decision["decision"], "like");
    let (status, between) = send(&app, "GET", &format!("/api/users/{sam}/matches/{alex}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(between["id"], match_id.as_str());
    let (_, score) = send(&app, "GET", &format!("/api/users/{alex}/score"), None).await;
    assert_eq!(score["score"], 1);
    let (status, _) = send(&app, "GET", &format!("/api/users/{alex}/matches/{}", uid(3)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, message) = send(
        &app,
        "POST",
        &format!("/api/matches/{match_id}/messages"),
        Some(json!({ "sender_id": alex, "text": "hi sam" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let message_id = message["id"].as_str().unwrap().to_string();
    assert!(message["read_at"].is_null());

    let read_uri = format!("/api/messages/{message_id}/read");
    let (status, _) = send(&app, "POST", &read_uri, Some(json!({ "user_id": alex }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, read) = send(&app, "POST", &read_uri, Some(json!({ "user_id": sam }))).await;
    assert_eq!(status, StatusCode::OK);
    let read_at = read["read_at"].clone();
    assert!(!read_at.is_null());

    let (_, again) = send(&app, "POST", &read_uri, Some(json!({ "user_id": sam }))).await;
    assert_eq!(again["read_at"], read_at);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/matches/{match_id}/messages?user_id={}", uid(3)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (swipes, events): (Vec<_>, Vec<_>) = harness
        .bus
        .published()
        .await
        .into_iter()
        .partition(|event| matches!(event, DomainEvent::SwipeProcessed { .. }));
    assert_eq!(swipes.len(), 2);
    assert!(matches!(events[0], DomainEvent::ProfileUpdated { .. }));
    assert!(matches!(events[1], DomainEvent::MatchCreated { .. }));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let harness = Harness::new(&[Person::new(1, Gender::Male, Gender::Female)]);
    let app = app(&harness);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}/location", uid(1)),
        Some(json!({ "latitude": 123.0, "longitude": 4.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", &format!("/api/users/{}", uid(42)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
