//! # axum router
//!
//! Routes are grouped by resource; every handler converts domain failures
//! through [`ApiError`](crate::ApiError).

pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use services::{ConversationService, MatchingService};
use tower::ServiceBuilder;

use crate::metrics::HttpMetrics;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub matching: MatchingService,
    pub conversations: ConversationService,
    pub metrics: Arc<HttpMetrics>,
}

/// Builds the full application router with its middleware stack.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/api/swipes", post(handlers::record_swipe))
        .route("/api/swipes/{from_user}/{to_user}", get(handlers::swipe_decision))
        .route("/api/recommendations", post(handlers::recommend_json))
        .route("/api/recommendations/{user_id}", get(handlers::recommend_query))
        .route("/api/users/{user_id}", get(handlers::profile_details))
        .route("/api/users/{user_id}/profile", put(handlers::update_profile))
        .route("/api/users/{user_id}/location", put(handlers::update_location))
        .route("/api/users/{user_id}/matches", get(handlers::list_matches))
        .route("/api/users/{user_id}/matches/{other_id}", get(handlers::match_between))
        .route("/api/users/{user_id}/score", get(handlers::match_score))
        .route("/api/matches/{match_id}", get(handlers::get_match))
        .route("/api/matches/{match_id}/unmatch", post(handlers::unmatch))
        .route(
            "/api/matches/{match_id}/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route("/api/messages/{message_id}/read", post(handlers::mark_read))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route_layer(axum::middleware::from_fn_with_state(
            state.metrics.clone(),
            middleware::record_metrics,
        ));

    api.layer(
        ServiceBuilder::new()
            .layer(middleware::set_request_id_layer())
            .layer(middleware::trace_layer())
            .layer(middleware::propagate_request_id_layer())
            .layer(middleware::cors_policy())
            .layer(middleware::timeout_layer(request_timeout)),
    )
    .with_state(state)
}
