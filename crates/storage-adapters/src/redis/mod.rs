//! # Redis caches and event channel
//!
//! Key layout:
//!
//! | Key            | Type   | Content                                  |
//! |----------------|--------|------------------------------------------|
//! | `profile:{id}` | string | JSON profile, `SET .. EX ttl`            |
//! | `deck:{id}`    | list   | candidate ids, front = next to serve     |
//!
//! Events go out with `PUBLISH {prefix}:{topic}` as JSON.

mod cache;
mod events;

pub use cache::RedisCache;
pub use events::{subscribe, RedisEventNotifier};

use std::time::Duration;

use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use domains::ports::CacheError;

/// Builds a connection pool. Connections are opened lazily on first use.
pub fn connect_pool(url: &str, max_size: usize) -> Result<Pool, CacheError> {
    let mut config = Config::from_url(url);
    config.pool = Some(PoolConfig::new(max_size));
    config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|err| CacheError::Unavailable(err.to_string()))
}

/// Whole seconds for `EX`/`EXPIRE`, never zero.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_at_least_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(1800)), 1800);
    }
}
