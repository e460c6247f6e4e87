//! Request and response bodies.

use chrono::{DateTime, Utc};
use domains::{Decision, Gender, Match, MatchId, MatchStatus, UserId};
use serde::{Deserialize, Serialize};
use services::RecommendationRequest;

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;
pub const DEFAULT_RECOMMENDATIONS: usize = 10;

/// Optional filters shared by the query-string and JSON forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationFilters {
    pub max_distance_km: Option<f64>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub count: Option<usize>,
}

impl RecommendationFilters {
    pub fn into_request(self, user_id: UserId) -> RecommendationRequest {
        RecommendationRequest {
            user_id,
            max_distance_km: self.max_distance_km.unwrap_or(DEFAULT_MAX_DISTANCE_KM),
            min_age: self.min_age,
            max_age: self.max_age,
            count: self.count.unwrap_or(DEFAULT_RECOMMENDATIONS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationBody {
    pub user_id: UserId,
    #[serde(flatten)]
    pub filters: RecommendationFilters,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdateBody {
    #[serde(default)]
    pub bio: String,
    pub preferred_gender: Gender,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationUpdateBody {
    pub latitude: f64,
    pub longitude: f64,
}

/// Identifies the acting user where the path does not.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActingUser {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageBody {
    pub sender_id: UserId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchView {
    pub id: MatchId,
    pub user_a: UserId,
    pub user_b: UserId,
    pub matched_at: DateTime<Utc>,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched_at: Option<DateTime<Utc>>,
}

impl From<Match> for MatchView {
    fn from(record: Match) -> Self {
        Self {
            id: record.id,
            user_a: record.user_a(),
            user_b: record.user_b(),
            matched_at: record.matched_at,
            status: record.status,
            unmatched_at: record.unmatched_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionView {
    pub from_user: UserId,
    pub to_user: UserId,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreView {
    pub user_id: UserId,
    pub score: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn missing_filters_take_defaults() {
        let request = RecommendationFilters::default().into_request(UserId(Uuid::from_u128(1)));
        assert_eq!(request.max_distance_km, DEFAULT_MAX_DISTANCE_KM);
        assert_eq!(request.count, DEFAULT_RECOMMENDATIONS);
        assert_eq!(request.min_age, None);
    }

    #[test]
    fn json_body_flattens_filters() {
        let body: RecommendationBody = serde_json::from_value(serde_json::json!({
            "user_id": Uuid::from_u128(1),
            "max_distance_km": 10.0,
            "count": 3
        }))
        .unwrap();
        let request = body.filters.into_request(body.user_id);
        assert_eq!(request.count, 3);
        assert_eq!(request.max_distance_km, 10.0);
    }
}
