use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::ports::{CacheError, DeckStore, ProfileStore};
use domains::{Profile, UserId};
use tokio::time::Instant;

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Profile cache and match scores with per-entry expiry. Expired entries are
/// dropped lazily.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    entries: Arc<DashMap<UserId, Expiring<Profile>>>,
    scores: Arc<DashMap<UserId, Expiring<u64>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.is_live())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, CacheError> {
        let live = self.entries.get(&id).map(|e| e.is_live().then(|| e.value.clone()));
        match live {
            Some(Some(profile)) => Ok(Some(profile)),
            Some(None) => {
                self.entries.remove_if(&id, |_, e| !e.is_live());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, profile: &Profile, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(profile.id, Expiring::new(profile.clone(), ttl));
        Ok(())
    }

    async fn remove(&self, id: UserId) -> Result<(), CacheError> {
        self.entries.remove(&id);
        Ok(())
    }

    async fn bump_score(&self, id: UserId, ttl: Duration) -> Result<u64, CacheError> {
        let mut score = self.scores.entry(id).or_insert_with(|| Expiring::new(0, ttl));
        let next = if score.is_live() { score.value + 1 } else { 1 };
        *score = Expiring::new(next, ttl);
        Ok(next)
    }

    async fn score(&self, id: UserId) -> Result<u64, CacheError> {
        Ok(self
            .scores
            .get(&id)
            .filter(|s| s.is_live())
            .map_or(0, |s| s.value))
    }
}

/// Deck cache. Each operation runs under the owner's entry lock, so a pop is
/// one atomic step and an emptied deck is removed in the same step.
#[derive(Clone, Default)]
pub struct MemoryDeckStore {
    decks: Arc<DashMap<UserId, Expiring<VecDeque<UserId>>>>,
}

impl MemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining ids of `owner`'s live deck, front first.
    pub fn peek(&self, owner: UserId) -> Option<Vec<UserId>> {
        self.decks
            .get(&owner)
            .filter(|d| d.is_live())
            .map(|d| d.value.iter().copied().collect())
    }
}

fn pop_front(deck: &mut VecDeque<UserId>, count: usize) -> Vec<UserId> {
    let n = count.min(deck.len());
    deck.drain(..n).collect()
}

#[async_trait]
impl DeckStore for MemoryDeckStore {
    async fn take(&self, owner: UserId, count: usize) -> Result<Option<Vec<UserId>>, CacheError> {
        let Entry::Occupied(mut deck) = self.decks.entry(owner) else {
            return Ok(None);
        };
        if !deck.get().is_live() {
            deck.remove();
            return Ok(None);
        }

        let popped = pop_front(&mut deck.get_mut().value, count);
        if deck.get().value.is_empty() {
            deck.remove();
        }
        Ok(Some(popped))
    }

    async fn refill_and_take(
        &self,
        owner: UserId,
        candidates: Vec<UserId>,
        ttl: Duration,
        count: usize,
    ) -> Result<Vec<UserId>, CacheError> {
        match self.decks.entry(owner) {
            Entry::Occupied(mut deck) => {
                if !deck.get().is_live() {
                    deck.insert(Expiring::new(candidates.into(), ttl));
                }
                let popped = pop_front(&mut deck.get_mut().value, count);
                if deck.get().value.is_empty() {
                    deck.remove();
                }
                Ok(popped)
            }
            Entry::Vacant(slot) => {
                let mut fresh: VecDeque<UserId> = candidates.into();
                let popped = pop_front(&mut fresh, count);
                if !fresh.is_empty() {
                    slot.insert(Expiring::new(fresh, ttl));
                }
                Ok(popped)
            }
        }
    }

    async fn remove_candidate(&self, owner: UserId, candidate: UserId) -> Result<(), CacheError> {
        if let Entry::Occupied(mut deck) = self.decks.entry(owner) {
            deck.get_mut().value.retain(|id| *id != candidate);
            if deck.get().value.is_empty() {
                deck.remove();
            }
        }
        Ok(())
    }

    async fn invalidate(&self, owner: UserId) -> Result<(), CacheError> {
        self.decks.remove(&owner);
        Ok(())
    }
}
