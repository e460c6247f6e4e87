use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, Script};
use deadpool_redis::{Connection, Pool};
use domains::ports::{CacheError, DeckStore, ProfileStore};
use domains::{Profile, UserId};
use uuid::Uuid;

use super::ttl_secs;

/// Pops up to ARGV[1] ids. A short deck is drained whole; LPOP drops the key
/// once the list is empty.
const TAKE_SCRIPT: &str = r#"
if redis.call('LLEN', KEYS[1]) == 0 then
    return false
end
return redis.call('LPOP', KEYS[1], tonumber(ARGV[1]))
"#;

/// Stores ARGV[3..] (expiring after ARGV[2] seconds) only when no deck
/// exists, then pops up to ARGV[1] ids. An existing deck belongs to a
/// concurrent refill and is popped as is.
const REFILL_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 and #ARGV > 2 then
    redis.call('RPUSH', KEYS[1], unpack(ARGV, 3))
    redis.call('EXPIRE', KEYS[1], tonumber(ARGV[2]))
end
local popped = redis.call('LPOP', KEYS[1], tonumber(ARGV[1]))
if not popped then
    return {}
end
return popped
"#;

/// Profile and deck caches over one pool.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    take: Script,
    refill: Script,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            take: Script::new(TAKE_SCRIPT),
            refill: Script::new(REFILL_SCRIPT),
        }
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::Unavailable(err.to_string()))
    }
}

fn profile_key(id: UserId) -> String {
    format!("profile:{id}")
}

fn score_key(id: UserId) -> String {
    format!("score:{id}")
}

fn deck_key(id: UserId) -> String {
    format!("deck:{id}")
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

fn parse_ids(raw: Vec<String>) -> Result<Vec<UserId>, CacheError> {
    raw.iter()
        .map(|s| {
            Uuid::parse_str(s)
                .map(UserId)
                .map_err(|err| CacheError::Serialization(format!("bad deck entry '{s}': {err}")))
        })
        .collect()
}

#[async_trait]
impl ProfileStore for RedisCache {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, CacheError> {
        let mut conn = self.conn().await?;
        let payload: Option<String> = redis::cmd("GET")
            .arg(profile_key(id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        payload
            .map(|json| {
                serde_json::from_str(&json).map_err(|err| CacheError::Serialization(err.to_string()))
            })
            .transpose()
    }

    async fn put(&self, profile: &Profile, ttl: Duration) -> Result<(), CacheError> {
        let payload =
            serde_json::to_string(profile).map_err(|err| CacheError::Serialization(err.to_string()))?;
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SET")
            .arg(profile_key(profile.id))
            .arg(payload)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn remove(&self, id: UserId) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(profile_key(id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn bump_score(&self, id: UserId, ttl: Duration) -> Result<u64, CacheError> {
        let key = score_key(id);
        let mut conn = self.conn().await?;
        let (score,): (u64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&key)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(ttl_secs(ttl))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(score)
    }

    async fn score(&self, id: UserId) -> Result<u64, CacheError> {
        let mut conn = self.conn().await?;
        let score: Option<u64> = redis::cmd("GET")
            .arg(score_key(id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(score.unwrap_or(0))
    }
}

#[async_trait]
impl DeckStore for RedisCache {
    async fn take(&self, owner: UserId, count: usize) -> Result<Option<Vec<UserId>>, CacheError> {
        let mut conn = self.conn().await?;
        let popped: Option<Vec<String>> = self
            .take
            .key(deck_key(owner))
            .arg(count)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        popped.map(parse_ids).transpose()
    }

    async fn refill_and_take(
        &self,
        owner: UserId,
        candidates: Vec<UserId>,
        ttl: Duration,
        count: usize,
    ) -> Result<Vec<UserId>, CacheError> {
        let mut conn = self.conn().await?;
        let mut invocation = self.refill.key(deck_key(owner));
        invocation.arg(count).arg(ttl_secs(ttl));
        for candidate in &candidates {
            invocation.arg(candidate.to_string());
        }
        let popped: Vec<String> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        parse_ids(popped)
    }

    async fn remove_candidate(&self, owner: UserId, candidate: UserId) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("LREM")
            .arg(deck_key(owner))
            .arg(0)
            .arg(candidate.to_string())
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn invalidate(&self, owner: UserId) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(deck_key(owner))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
