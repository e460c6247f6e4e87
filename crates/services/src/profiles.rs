//! # Profile cache
//!
//! Cache-aside over [`UserRepository`]: reads try the cache first and
//! repopulate it on a miss; mutations go to the source of record and then
//! drop both the profile and the owner's deck. The same store keeps each
//! user's expiring match score.

use std::sync::Arc;

use domains::ports::{DeckStore, ProfileStore, UserRepository};
use domains::{DomainResult, Profile, ProfileDetails, UserId};
use tracing::{debug, warn};

use crate::{within, CachePolicy};

#[derive(Clone)]
pub struct ProfileCache {
    users: Arc<dyn UserRepository>,
    store: Arc<dyn ProfileStore>,
    decks: Arc<dyn DeckStore>,
    policy: CachePolicy,
}

impl ProfileCache {
    pub fn new(
        users: Arc<dyn UserRepository>,
        store: Arc<dyn ProfileStore>,
        decks: Arc<dyn DeckStore>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            users,
            store,
            decks,
            policy,
        }
    }

    pub async fn get_profile(&self, id: UserId) -> DomainResult<Option<Profile>> {
        match within(self.policy.cache_timeout, self.store.get(id)).await {
            Ok(Some(profile)) => {
                debug!(user_id = %id, "profile cache hit");
                return Ok(Some(profile));
            }
            Ok(None) => debug!(user_id = %id, "profile cache miss"),
            Err(err) => warn!(user_id = %id, error = %err, "profile cache read failed"),
        }

        let Some(profile) = self.users.get_profile(id).await? else {
            return Ok(None);
        };

        if let Err(err) = within(
            self.policy.cache_timeout,
            self.store.put(&profile, self.policy.profile_ttl),
        )
        .await
        {
            warn!(user_id = %id, error = %err, "profile cache write failed");
        }

        Ok(Some(profile))
    }

    /// Profile plus photos, straight from the source of record.
    pub async fn get_details(&self, id: UserId) -> DomainResult<Option<ProfileDetails>> {
        self.users.get_details(id).await
    }

    /// Counts one more match for `id`. Best-effort: a cache outage loses the
    /// increment.
    pub async fn bump_score(&self, id: UserId) {
        match within(self.policy.cache_timeout, self.store.bump_score(id, self.policy.score_ttl)).await {
            Ok(score) => debug!(user_id = %id, score, "match score bumped"),
            Err(err) => warn!(user_id = %id, error = %err, "match score update failed"),
        }
    }

    /// Matches counted for `id` within the score window. Zero when unknown
    /// or when the cache is unreachable.
    pub async fn score(&self, id: UserId) -> u64 {
        within(self.policy.cache_timeout, self.store.score(id))
            .await
            .unwrap_or_else(|err| {
                warn!(user_id = %id, error = %err, "match score read failed");
                0
            })
    }

    /// Drops the cached profile and the user's deck. Any filter input may
    /// have changed, so the deck is no longer trustworthy either.
    pub async fn invalidate(&self, id: UserId) {
        if let Err(err) = within(self.policy.cache_timeout, self.store.remove(id)).await {
            warn!(user_id = %id, error = %err, "profile cache invalidation failed");
        }
        if let Err(err) = within(self.policy.cache_timeout, self.decks.invalidate(id)).await {
            warn!(user_id = %id, error = %err, "deck invalidation failed");
        }
    }
}
