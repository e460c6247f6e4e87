//! # configs
//!
//! Layered settings: built-in defaults, then an optional
//! `config/matchmaker.toml`, then `MATCHMAKER__SECTION__KEY` environment
//! variables. A `.env` file is read first when present.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "MATCHMAKER";
const ENV_SEPARATOR: &str = "__";
const CONFIG_FILE: &str = "config/matchmaker";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub storage: StorageBackend,
    pub cache: CacheBackend,
    /// JSON array of users loaded into in-memory storage at startup.
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub url: Option<SecretString>,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub profile_ttl_secs: u64,
    pub deck_ttl_secs: u64,
    pub score_ttl_secs: u64,
    pub op_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    pub channel_prefix: String,
    pub publish_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub cache: CacheSettings,
    pub events: EventSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Loads `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(None)
    }

    /// Like [`Settings::load`] but reads variables from `vars` instead of the
    /// process environment and skips `.env`.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(Some(vars))
    }

    fn build(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_secs", 10)?
            .set_default("backend.storage", "memory")?
            .set_default("backend.cache", "memory")?
            .set_default("database.max_connections", 10)?
            .set_default("redis.pool_size", 16)?
            .set_default("cache.profile_ttl_secs", 24 * 60 * 60)?
            .set_default("cache.deck_ttl_secs", 30 * 60)?
            .set_default("cache.score_ttl_secs", 30 * 24 * 60 * 60)?
            .set_default("cache.op_timeout_ms", 250)?
            .set_default("events.channel_prefix", "matchmaker")?
            .set_default("events.publish_timeout_ms", 500)?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        tracing::debug!(
            storage = ?settings.backend.storage,
            cache = ?settings.backend.cache,
            "configuration loaded"
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.storage == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Invalid(
                "backend.storage = postgres requires database.url".into(),
            ));
        }
        if self.backend.cache == CacheBackend::Redis && self.redis.url.is_none() {
            return Err(ConfigError::Invalid(
                "backend.cache = redis requires redis.url".into(),
            ));
        }
        if self.cache.op_timeout_ms == 0 || self.events.publish_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        Ok(())
    }

    pub fn profile_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.profile_ttl_secs)
    }

    pub fn deck_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.deck_ttl_secs)
    }

    pub fn score_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.score_ttl_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache.op_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.events.publish_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
