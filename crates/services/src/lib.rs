//! # services
//!
//! Use cases of the matchmaker, composed from the ports in `domains`:
//! the profile and deck caches, the swipe/recommendation orchestrator and
//! the match conversation lifecycle.
//!
//! Cache and notifier calls are bounded by [`CachePolicy`] timeouts and fail
//! open; only source-of-record failures reach the caller.

pub mod conversations;
pub mod decks;
pub mod events;
pub mod matching;
pub mod profiles;

use std::future::Future;
use std::time::Duration;

use domains::ports::CacheError;

pub use conversations::ConversationService;
pub use decks::{DeckCache, DeckFilters};
pub use events::EventEmitter;
pub use matching::{CandidateSummary, DecisionRequest, MatchingService, RecommendationRequest, SwipeResult};
pub use profiles::ProfileCache;

/// Expiry and timeout knobs shared by the caches and the event emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub profile_ttl: Duration,
    pub deck_ttl: Duration,
    /// How long a match score survives without a new match.
    pub score_ttl: Duration,
    pub cache_timeout: Duration,
    pub notify_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            profile_ttl: Duration::from_secs(24 * 60 * 60),
            deck_ttl: Duration::from_secs(30 * 60),
            score_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            cache_timeout: Duration::from_millis(250),
            notify_timeout: Duration::from_millis(500),
        }
    }
}

/// Runs a cache call, turning an elapsed deadline into [`CacheError::Timeout`].
pub(crate) async fn within<T, F>(limit: Duration, call: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(CacheError::Timeout))
}
