//! # Handlers
//!
//! Thin adapters between HTTP and the services: extract, call, map errors.
//! Acting identities travel in the body or query string.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use domains::{ChatMessage, MatchId, MessageId, Profile, ProfileDetails, UserId};
use services::{CandidateSummary, DecisionRequest, SwipeResult};
use tracing::error;

use super::AppState;
use crate::dto::{
    ActingUser, DecisionView, HealthResponse, LocationUpdateBody, MatchView, ProfileUpdateBody,
    RecommendationBody, RecommendationFilters, ScoreView, SendMessageBody,
};
use crate::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn record_swipe(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<SwipeResult> {
    Ok(Json(state.matching.record_decision(request).await?))
}

pub async fn swipe_decision(
    State(state): State<AppState>,
    Path((from_user, to_user)): Path<(UserId, UserId)>,
) -> ApiResult<DecisionView> {
    let decision = state.matching.decision_of(from_user, to_user).await?;
    Ok(Json(DecisionView {
        from_user,
        to_user,
        decision,
    }))
}

pub async fn recommend_query(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(filters): Query<RecommendationFilters>,
) -> ApiResult<Vec<CandidateSummary>> {
    let request = filters.into_request(user_id);
    Ok(Json(state.matching.recommend(request).await?))
}

pub async fn recommend_json(
    State(state): State<AppState>,
    Json(body): Json<RecommendationBody>,
) -> ApiResult<Vec<CandidateSummary>> {
    let request = body.filters.into_request(body.user_id);
    Ok(Json(state.matching.recommend(request).await?))
}

pub async fn profile_details(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<ProfileDetails> {
    Ok(Json(state.matching.profile_details(user_id).await?))
}

pub async fn match_score(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<ScoreView> {
    let score = state.matching.match_score(user_id).await?;
    Ok(Json(ScoreView { user_id, score }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<ProfileUpdateBody>,
) -> ApiResult<Profile> {
    let profile = state
        .matching
        .update_profile(user_id, &body.bio, body.preferred_gender)
        .await?;
    Ok(Json(profile))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<LocationUpdateBody>,
) -> ApiResult<Profile> {
    let profile = state
        .matching
        .update_location(user_id, body.latitude, body.longitude)
        .await?;
    Ok(Json(profile))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Vec<MatchView>> {
    let matches = state.conversations.list_matches(user_id).await?;
    Ok(Json(matches.into_iter().map(MatchView::from).collect()))
}

pub async fn match_between(
    State(state): State<AppState>,
    Path((user_id, other_id)): Path<(UserId, UserId)>,
) -> ApiResult<MatchView> {
    Ok(Json(state.conversations.match_between(user_id, other_id).await?.into()))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchView> {
    Ok(Json(state.conversations.get_match(match_id).await?.into()))
}

pub async fn unmatch(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(actor): Json<ActingUser>,
) -> ApiResult<MatchView> {
    let record = state.conversations.unmatch(match_id, actor.user_id).await?;
    Ok(Json(record.into()))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Query(requester): Query<ActingUser>,
) -> ApiResult<Vec<ChatMessage>> {
    let history = state
        .conversations
        .list_messages(match_id, requester.user_id)
        .await?;
    Ok(Json(history))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(body): Json<SendMessageBody>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let message = state
        .conversations
        .send_message(match_id, body.sender_id, &body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<MessageId>,
    Json(reader): Json<ActingUser>,
) -> ApiResult<ChatMessage> {
    Ok(Json(state.conversations.mark_read(message_id, reader.user_id).await?))
}
