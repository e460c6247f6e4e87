//! # Ports
//!
//! Every adapter must implement these traits to be wired by the binary.
//! Repositories speak [`DomainResult`]; caches and the notifier have their own
//! error types because their failures are absorbed, never surfaced.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::errors::DomainResult;
use crate::events::DomainEvent;
use crate::matches::{ChatMessage, Match};
use crate::models::{CandidateQuery, Gender, GeoPoint, MatchId, MessageId, Profile, ProfileDetails, UserId};
use crate::pair::PairKey;
use crate::swipes::{DecisionOutcome, DecisionWrite, SwipePair};

/// Source of record for users and their photos.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_profile(&self, id: UserId) -> DomainResult<Option<Profile>>;

    /// Profile with its photo list.
    async fn get_details(&self, id: UserId) -> DomainResult<Option<ProfileDetails>>;

    /// Photo URLs per user, main photo first. Users without photos are absent.
    async fn photo_urls(&self, ids: &[UserId]) -> DomainResult<HashMap<UserId, Vec<String>>>;

    async fn update_profile(
        &self,
        id: UserId,
        bio: &str,
        preferred_gender: Gender,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>>;

    async fn update_location(
        &self,
        id: UserId,
        location: GeoPoint,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>>;
}

/// Source of record for swipe pairs. Owns match creation because the
/// mutuality check must share the decision write's atomic unit.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SwipeStore: Send + Sync {
    /// Read-or-create the pair row, apply the decision and, when the pair is
    /// mutual, read-or-create its match. Linearizable per [`PairKey`].
    async fn record_decision(&self, write: DecisionWrite) -> DomainResult<DecisionOutcome>;

    async fn get_pair(&self, key: PairKey) -> DomainResult<Option<SwipePair>>;

    /// Everyone `user` has already liked or disliked.
    async fn decided_by(&self, user: UserId) -> DomainResult<Vec<UserId>>;
}

/// Source of record for matches and their messages.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn get_match(&self, id: MatchId) -> DomainResult<Option<Match>>;

    async fn find_by_pair(&self, key: PairKey) -> DomainResult<Option<Match>>;

    /// Matches involving `user`, newest first.
    async fn list_for_user(&self, user: UserId) -> DomainResult<Vec<Match>>;

    /// Applies [`Match::unmatch`] under the match's row lock.
    async fn unmatch(&self, id: MatchId, by: UserId, at: DateTime<Utc>) -> DomainResult<Match>;

    /// Applies [`ChatMessage::compose`] against the locked match and stores
    /// the result, so an unmatch cannot slip in between check and insert.
    async fn append_message(
        &self,
        id: MatchId,
        sender: UserId,
        text: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<ChatMessage>;

    /// Messages of a match, oldest first.
    async fn list_messages(&self, id: MatchId) -> DomainResult<Vec<ChatMessage>>;

    /// Applies [`ChatMessage::mark_read`] under the message's row lock.
    async fn mark_read(
        &self,
        id: MessageId,
        reader: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<ChatMessage>;
}

/// Collaborator-owned candidate search.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CandidateSelector: Send + Sync {
    /// Up to `query.count` identities, most recently active first.
    async fn select(&self, query: &CandidateQuery) -> DomainResult<Vec<UserId>>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Key/value store backing the profile cache.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, CacheError>;
    async fn put(&self, profile: &Profile, ttl: Duration) -> Result<(), CacheError>;
    async fn remove(&self, id: UserId) -> Result<(), CacheError>;

    /// Adds one to the user's match score and restarts its expiry. Returns
    /// the new score.
    async fn bump_score(&self, id: UserId, ttl: Duration) -> Result<u64, CacheError>;

    /// Zero when the score was never bumped or has expired.
    async fn score(&self, id: UserId) -> Result<u64, CacheError>;
}

/// Per-user candidate queue backing the deck cache. Every method is a
/// single atomic step on the owner's key; an emptied deck disappears.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeckStore: Send + Sync {
    /// Pops up to `count` ids from the front. A deck shorter than `count` is
    /// drained whole, so the returned list may be short. `None` on a miss.
    async fn take(&self, owner: UserId, count: usize) -> Result<Option<Vec<UserId>>, CacheError>;

    /// Stores `candidates` (expiring after `ttl`) if the owner has no deck,
    /// then pops up to `count` from the front. An existing deck was stored by
    /// a concurrent refill; it is popped as is and `candidates` are dropped.
    async fn refill_and_take(
        &self,
        owner: UserId,
        candidates: Vec<UserId>,
        ttl: Duration,
        count: usize,
    ) -> Result<Vec<UserId>, CacheError>;

    /// Drops one candidate from the owner's deck, wherever it sits.
    async fn remove_candidate(&self, owner: UserId, candidate: UserId) -> Result<(), CacheError>;

    async fn invalidate(&self, owner: UserId) -> Result<(), CacheError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
    #[error("notifier timed out")]
    Timeout,
    #[error("event serialization error: {0}")]
    Serialization(String),
}

/// Outbound event channel to other processes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError>;
}
