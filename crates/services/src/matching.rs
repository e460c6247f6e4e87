//! # Matching orchestrator
//!
//! Answers "swipe" and "recommend" requests by composing the pair
//! canonicalizer, the swipe store, both caches and the event emitter.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use domains::ports::{SwipeStore, UserRepository};
use domains::{
    canonicalize, AgeRange, Decision, DecisionWrite, DomainError, DomainEvent, DomainResult, Gender,
    GeoPoint, MatchId, MatchRecord, Profile, UserId,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::decks::{DeckCache, DeckFilters};
use crate::events::EventEmitter;
use crate::profiles::ProfileCache;

pub const MAX_RECOMMENDATIONS: usize = 50;
pub const MAX_BIO_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DecisionRequest {
    pub from_user: UserId,
    pub to_user: UserId,
    pub liked: bool,
    #[serde(default)]
    pub superliked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwipeResult {
    pub is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
    pub message: String,
}

impl SwipeResult {
    fn matched(id: MatchId) -> Self {
        Self {
            is_match: true,
            match_id: Some(id),
            message: "It's a match!".to_string(),
        }
    }

    fn pending(liked: bool) -> Self {
        Self {
            is_match: false,
            match_id: None,
            message: if liked { "Like sent" } else { "Skipped" }.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub user_id: UserId,
    pub max_distance_km: f64,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub gender: Gender,
    pub location: GeoPoint,
    pub photo_urls: Vec<String>,
    pub last_active: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MatchingService {
    swipes: Arc<dyn SwipeStore>,
    users: Arc<dyn UserRepository>,
    profiles: ProfileCache,
    decks: DeckCache,
    events: EventEmitter,
}

impl MatchingService {
    pub fn new(
        swipes: Arc<dyn SwipeStore>,
        users: Arc<dyn UserRepository>,
        profiles: ProfileCache,
        decks: DeckCache,
        events: EventEmitter,
    ) -> Self {
        Self {
            swipes,
            users,
            profiles,
            decks,
            events,
        }
    }

    /// Records one side's decision and reports whether the pair is now a match.
    ///
    /// The decision write is the only step whose failure reaches the caller;
    /// deck cleanup, scores and event emission are best-effort.
    pub async fn record_decision(&self, request: DecisionRequest) -> DomainResult<SwipeResult> {
        let canonical = canonicalize(request.from_user, request.to_user)?;
        self.require_known(request.from_user).await?;
        self.require_known(request.to_user).await?;

        let at = Utc::now();
        let write = DecisionWrite {
            key: canonical.key,
            role: canonical.first,
            liked: request.liked,
            superliked: request.superliked,
            at,
        };
        let outcome = self.swipes.record_decision(write).await.map_err(|err| {
            error!(from = %request.from_user, to = %request.to_user, error = %err, "decision write failed");
            err
        })?;
        debug!(
            from = %request.from_user,
            to = %request.to_user,
            liked = request.liked,
            changed = outcome.changed,
            "decision recorded"
        );

        self.decks.discard(request.from_user, request.to_user).await;
        self.events
            .emit(DomainEvent::SwipeProcessed {
                from_user: request.from_user,
                to_user: request.to_user,
                liked: request.liked,
                superliked: request.superliked,
                processed_at: at,
            })
            .await;

        match outcome.matched {
            Some(MatchRecord { record, created }) if record.is_active() => {
                if created {
                    info!(match_id = %record.id, user_a = %record.user_a(), user_b = %record.user_b(), "match created");
                    self.decks.discard(request.to_user, request.from_user).await;
                    self.profiles.bump_score(request.from_user).await;
                    self.profiles.bump_score(request.to_user).await;
                    self.events
                        .emit(DomainEvent::MatchCreated {
                            match_id: record.id,
                            user_a: record.user_a(),
                            user_b: record.user_b(),
                            matched_at: record.matched_at,
                        })
                        .await;
                }
                Ok(SwipeResult::matched(record.id))
            }
            Some(MatchRecord { record, .. }) => {
                debug!(match_id = %record.id, "pair is mutual but its match was unmatched");
                Ok(SwipeResult::pending(request.liked))
            }
            None => Ok(SwipeResult::pending(request.liked)),
        }
    }

    /// Next candidates for `request.user_id`, consumed from their deck.
    pub async fn recommend(&self, request: RecommendationRequest) -> DomainResult<Vec<CandidateSummary>> {
        if request.count == 0 || request.count > MAX_RECOMMENDATIONS {
            return Err(DomainError::invalid_argument(format!(
                "count must be between 1 and {MAX_RECOMMENDATIONS}"
            )));
        }
        if !request.max_distance_km.is_finite() || request.max_distance_km <= 0.0 {
            return Err(DomainError::invalid_argument("max distance must be positive"));
        }
        let filters = DeckFilters {
            max_distance_km: request.max_distance_km,
            ages: AgeRange::new(request.min_age, request.max_age)?,
        };
        let seeker = self.require_known(request.user_id).await?;

        let ids = self.decks.get_or_build(&seeker, &filters, request.count).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = join_all(ids.iter().map(|id| self.profiles.get_profile(*id))).await;
        let mut photos = self.users.photo_urls(&ids).await?;

        let today = Utc::now().date_naive();
        let mut summaries = Vec::with_capacity(ids.len());
        for (id, profile) in ids.iter().zip(profiles) {
            let Some(profile) = profile? else {
                debug!(candidate = %id, "candidate vanished from source of record");
                continue;
            };
            if !admits(&seeker, &filters, &profile, today) {
                debug!(candidate = %id, "stale deck entry no longer matches filters");
                continue;
            }
            let photo_urls = photos.remove(id).unwrap_or_default();
            summaries.push(summarize(profile, photo_urls, today));
        }

        Ok(summaries)
    }

    /// What `from` decided about `to`. `Undecided` when they never swiped.
    pub async fn decision_of(&self, from: UserId, to: UserId) -> DomainResult<Decision> {
        let canonical = canonicalize(from, to)?;
        let pair = self.swipes.get_pair(canonical.key).await?;
        Ok(pair.map_or(Decision::Undecided, |pair| pair.decision(canonical.first)))
    }

    /// Matches `id` took part in during the score window.
    pub async fn match_score(&self, id: UserId) -> DomainResult<u64> {
        self.require_known(id).await?;
        Ok(self.profiles.score(id).await)
    }

    /// Rich profile read; bypasses the profile cache.
    pub async fn profile_details(&self, id: UserId) -> DomainResult<domains::ProfileDetails> {
        self.profiles
            .get_details(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))
    }

    pub async fn update_profile(
        &self,
        id: UserId,
        bio: &str,
        preferred_gender: Gender,
    ) -> DomainResult<Profile> {
        let bio = bio.trim();
        if bio.chars().count() > MAX_BIO_CHARS {
            return Err(DomainError::invalid_argument(format!(
                "bio is limited to {MAX_BIO_CHARS} characters"
            )));
        }
        let profile = self
            .users
            .update_profile(id, bio, preferred_gender, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;
        self.profile_changed(&profile).await;
        Ok(profile)
    }

    pub async fn update_location(&self, id: UserId, latitude: f64, longitude: f64) -> DomainResult<Profile> {
        let location = GeoPoint::new(latitude, longitude)?;
        let profile = self
            .users
            .update_location(id, location, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;
        self.profile_changed(&profile).await;
        Ok(profile)
    }

    /// Reacts to a profile change announced by another process.
    pub async fn handle_event(&self, event: &DomainEvent) {
        if let DomainEvent::ProfileUpdated { user_id, .. } = event {
            debug!(user_id = %user_id, "remote profile update; invalidating caches");
            self.profiles.invalidate(*user_id).await;
        }
    }

    async fn profile_changed(&self, profile: &Profile) {
        self.profiles.invalidate(profile.id).await;
        self.events
            .emit(DomainEvent::ProfileUpdated {
                user_id: profile.id,
                updated_at: profile.last_active,
            })
            .await;
    }

    async fn require_known(&self, id: UserId) -> DomainResult<Profile> {
        self.profiles
            .get_profile(id)
            .await?
            .ok_or_else(|| DomainError::invalid_argument(format!("unknown user {id}")))
    }
}

fn admits(seeker: &Profile, filters: &DeckFilters, candidate: &Profile, today: NaiveDate) -> bool {
    candidate.id != seeker.id
        && candidate.gender == seeker.preferred_gender
        && filters.ages.admits(candidate.birth_date, today)
        && seeker
            .location
            .bounding_box(filters.max_distance_km)
            .contains(&candidate.location)
}

fn summarize(profile: Profile, photo_urls: Vec<String>, today: NaiveDate) -> CandidateSummary {
    CandidateSummary {
        id: profile.id,
        age: profile.age_on(today),
        first_name: profile.first_name,
        last_name: profile.last_name,
        gender: profile.gender,
        location: profile.location,
        photo_urls,
        last_active: profile.last_active,
    }
}
