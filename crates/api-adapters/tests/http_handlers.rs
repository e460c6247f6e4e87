use std::sync::Arc;
use std::time::Duration;

use api_adapters::web::{router, AppState};
use api_adapters::HttpMetrics;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use domains::{Gender, GeoPoint, Photo, Profile, ProfileDetails, UserId};
use serde_json::{json, Value};
use services::{CachePolicy, ConversationService, DeckCache, EventEmitter, MatchingService, ProfileCache};
use storage_adapters::memory::{MemoryDeckStore, MemoryEventBus, MemoryProfileStore, MemoryStore};
use tower::ServiceExt;
use uuid::Uuid;

fn person(n: u128, gender: Gender, preferred: Gender) -> ProfileDetails {
    ProfileDetails {
        profile: Profile {
            id: UserId(Uuid::from_u128(n)),
            first_name: format!("Person{n}"),
            last_name: "Example".into(),
            bio: String::new(),
            birth_date: NaiveDate::from_ymd_opt(1995, 6, 15).unwrap(),
            gender,
            preferred_gender: preferred,
            location: GeoPoint::new(52.37, 4.89).unwrap(),
            last_active: Utc::now(),
        },
        photos: vec![Photo {
            url: format!("https://cdn.example/{n}.jpg"),
            is_main: true,
        }],
    }
}

fn app() -> Router {
    let store = MemoryStore::new();
    store.insert_user(person(1, Gender::Male, Gender::Female));
    store.insert_user(person(2, Gender::Female, Gender::Male));
    store.insert_user(person(3, Gender::Female, Gender::Male));

    let policy = CachePolicy::default();
    let decks = Arc::new(MemoryDeckStore::new());
    let profiles = ProfileCache::new(
        Arc::new(store.clone()),
        Arc::new(MemoryProfileStore::new()),
        decks.clone(),
        policy,
    );
    let deck_cache = DeckCache::new(decks, Arc::new(store.clone()), Arc::new(store.clone()), policy);
    let events = EventEmitter::new(Arc::new(MemoryEventBus::new()), policy.notify_timeout);
    let matching = MatchingService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        profiles,
        deck_cache,
        events,
    );

    router(
        AppState {
            matching,
            conversations: ConversationService::new(Arc::new(store)),
            metrics: Arc::new(HttpMetrics::new()),
        },
        Duration::from_secs(5),
    )
}

fn uid(n: u128) -> String {
    Uuid::from_u128(n).to_string()
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn swipe(app: &Router, from: u128, to: u128, liked: bool) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        "/api/swipes",
        Some(json!({ "from_user": uid(from), "to_user": uid(to), "liked": liked })),
    )
    .await
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = call(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn mutual_like_over_http_creates_a_match() {
    let app = app();

    let (status, first) = swipe(&app, 1, 2, true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["is_match"], false);
    assert_eq!(first["message"], "Like sent");

    let (_, second) = swipe(&app, 2, 1, true).await;
    assert_eq!(second["is_match"], true);
    assert_eq!(second["message"], "It's a match!");
    let match_id = second["match_id"].as_str().unwrap().to_string();

    let (status, listed) = call(&app, "GET", &format!("/api/users/{}/matches", uid(1)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["id"], match_id.as_str());
    assert_eq!(listed[0]["status"], "active");
}

#[tokio::test]
async fn self_swipe_is_a_bad_request() {
    let (status, body) = swipe(&app(), 1, 1, true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_argument");
    assert_eq!(body["error"]["retryable"], false);
}

#[tokio::test]
async fn unknown_match_is_not_found() {
    let (status, _) = call(&app(), "GET", &format!("/api/matches/{}", uid(999)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_unmatch_conflicts_and_blocks_chat() {
    let app = app();
    swipe(&app, 1, 2, true).await;
    let (_, matched) = swipe(&app, 2, 1, true).await;
    let match_id = matched["match_id"].as_str().unwrap().to_string();

    let (status, sent) = call(
        &app,
        "POST",
        &format!("/api/matches/{match_id}/messages"),
        Some(json!({ "sender_id": uid(1), "text": "hello!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["text"], "hello!");

    let unmatch_uri = format!("/api/matches/{match_id}/unmatch");
    let (status, _) = call(&app, "POST", &unmatch_uri, Some(json!({ "user_id": uid(2) }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "POST", &unmatch_uri, Some(json!({ "user_id": uid(2) }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/matches/{match_id}/messages"),
        Some(json!({ "sender_id": uid(1), "text": "still there?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, history) = call(
        &app,
        "GET",
        &format!("/api/matches/{match_id}/messages?user_id={}", uid(2)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recommendations_follow_preferences() {
    let app = app();
    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/recommendations/{}?count=5&min_age=18&max_age=60", uid(1)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&uid(1).as_str()));
    assert_eq!(body[0]["photo_urls"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_count_is_rejected() {
    let (status, _) = call(
        &app(),
        "POST",
        "/api/recommendations",
        Some(json!({ "user_id": uid(1), "count": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn implausible_max_age_is_rejected() {
    let (status, body) = call(
        &app(),
        "GET",
        &format!("/api/recommendations/{}?max_age=4294967295", uid(1)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_argument");
}

#[tokio::test]
async fn responses_carry_request_id_and_are_counted() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"route="/health""#));
}
