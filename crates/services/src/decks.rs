//! # Deck cache
//!
//! A per-user queue of candidate identities, consumed front to back. A hit
//! pops straight from the cache. A deck shorter than the request is claimed
//! whole, and the rest comes from the [`CandidateSelector`] like a miss does:
//! twice the missing count is selected, stored and popped from. Only one
//! concurrent builder ever stores a deck; the others pop from it.
//!
//! Empty selector results are not cached, so a user with no candidates pays
//! for a fresh selection on every request.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use domains::ports::{CandidateSelector, DeckStore, SwipeStore};
use domains::{AgeRange, CandidateQuery, DomainResult, Profile, UserId};
use tracing::{debug, warn};

use crate::{within, CachePolicy};

const OVERSAMPLING: usize = 2;

/// Filters a deck is built with, on top of the seeker's own profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckFilters {
    pub max_distance_km: f64,
    pub ages: AgeRange,
}

#[derive(Clone)]
pub struct DeckCache {
    decks: Arc<dyn DeckStore>,
    selector: Arc<dyn CandidateSelector>,
    swipes: Arc<dyn SwipeStore>,
    policy: CachePolicy,
}

impl DeckCache {
    pub fn new(
        decks: Arc<dyn DeckStore>,
        selector: Arc<dyn CandidateSelector>,
        swipes: Arc<dyn SwipeStore>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            decks,
            selector,
            swipes,
            policy,
        }
    }

    /// Up to `count` candidate ids for `seeker`, removed from the deck.
    pub async fn get_or_build(
        &self,
        seeker: &Profile,
        filters: &DeckFilters,
        count: usize,
    ) -> DomainResult<Vec<UserId>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut served = match within(self.policy.cache_timeout, self.decks.take(seeker.id, count)).await {
            Ok(Some(ids)) if ids.len() >= count => {
                debug!(user_id = %seeker.id, popped = ids.len(), "deck cache hit");
                return Ok(ids);
            }
            Ok(Some(ids)) => {
                debug!(user_id = %seeker.id, claimed = ids.len(), "deck cache short; topping up");
                ids
            }
            Ok(None) => {
                debug!(user_id = %seeker.id, "deck cache miss");
                Vec::new()
            }
            Err(err) => {
                warn!(user_id = %seeker.id, error = %err, "deck cache read failed");
                Vec::new()
            }
        };
        let needed = count - served.len();

        let query = self
            .query_for(seeker, filters, &served, needed * OVERSAMPLING)
            .await?;
        let candidates = self.selector.select(&query).await?;
        if candidates.is_empty() {
            debug!(user_id = %seeker.id, "no candidates; nothing cached");
            return Ok(served);
        }

        let refill = self.decks.refill_and_take(
            seeker.id,
            candidates.clone(),
            self.policy.deck_ttl,
            needed,
        );
        match within(self.policy.cache_timeout, refill).await {
            Ok(ids) => served.extend(ids),
            Err(err) => {
                warn!(user_id = %seeker.id, error = %err, "deck cache refill failed; serving uncached");
                served.extend(candidates.into_iter().take(needed));
            }
        }
        Ok(served)
    }

    /// Removes `candidate` from `owner`'s deck, e.g. after a swipe.
    pub async fn discard(&self, owner: UserId, candidate: UserId) {
        let removal = self.decks.remove_candidate(owner, candidate);
        if let Err(err) = within(self.policy.cache_timeout, removal).await {
            warn!(user_id = %owner, candidate = %candidate, error = %err, "deck cleanup failed");
        }
    }

    async fn query_for(
        &self,
        seeker: &Profile,
        filters: &DeckFilters,
        claimed: &[UserId],
        count: usize,
    ) -> DomainResult<CandidateQuery> {
        let mut exclude: HashSet<UserId> = self.swipes.decided_by(seeker.id).await?.into_iter().collect();
        exclude.insert(seeker.id);
        exclude.extend(claimed.iter().copied());

        Ok(CandidateQuery {
            seeker: seeker.id,
            location: seeker.location,
            max_distance_km: filters.max_distance_km,
            gender: seeker.preferred_gender,
            ages: filters.ages,
            exclude,
            count,
            as_of: Utc::now().date_naive(),
        })
    }
}
