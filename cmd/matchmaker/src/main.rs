//! # Matchmaker binary
//!
//! Assembles the application from configuration: the source of record and
//! the cache/event backend are chosen at runtime, within the adapters this
//! build was compiled with.

#[cfg(not(feature = "web-axum"))]
compile_error!("the matchmaker binary needs the `web-axum` feature");

mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use api_adapters::web::{router, AppState};
use api_adapters::HttpMetrics;
use configs::{CacheBackend, Settings, StorageBackend};
use domains::ProfileDetails;
use domains::ports::{
    CandidateSelector, DeckStore, EventNotifier, MatchRepository, ProfileStore, SwipeStore,
    UserRepository,
};
use futures_util::StreamExt;
use services::{
    CachePolicy, ConversationService, DeckCache, EventEmitter, MatchingService, ProfileCache,
};
use storage_adapters::memory::{MemoryDeckStore, MemoryEventBus, MemoryProfileStore, MemoryStore};
use storage_adapters::EventStream;
use tracing::{info, warn};

struct SourceOfRecord {
    users: Arc<dyn UserRepository>,
    swipes: Arc<dyn SwipeStore>,
    matches: Arc<dyn MatchRepository>,
    selector: Arc<dyn CandidateSelector>,
}

struct CacheLayer {
    profiles: Arc<dyn ProfileStore>,
    decks: Arc<dyn DeckStore>,
    notifier: Arc<dyn EventNotifier>,
    events: EventStream,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    logging::init_tracing(&settings.log)?;

    let source = source_of_record(&settings).await?;
    let cache = cache_layer(&settings).await?;
    let policy = CachePolicy {
        profile_ttl: settings.profile_ttl(),
        deck_ttl: settings.deck_ttl(),
        score_ttl: settings.score_ttl(),
        cache_timeout: settings.cache_timeout(),
        notify_timeout: settings.publish_timeout(),
    };

    let profiles = ProfileCache::new(source.users.clone(), cache.profiles, cache.decks.clone(), policy);
    let decks = DeckCache::new(cache.decks, source.selector, source.swipes.clone(), policy);
    let emitter = EventEmitter::new(cache.notifier, policy.notify_timeout);
    let matching = MatchingService::new(source.swipes, source.users, profiles, decks, emitter);
    let conversations = ConversationService::new(source.matches);

    let subscriber = tokio::spawn(consume_events(cache.events, matching.clone()));

    let app = router(
        AppState {
            matching,
            conversations,
            metrics: Arc::new(HttpMetrics::new()),
        },
        settings.request_timeout(),
    );

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, storage = ?settings.backend.storage, cache = ?settings.backend.cache, "matchmaker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    subscriber.abort();
    info!("matchmaker stopped");
    Ok(())
}

/// Applies changes announced by other processes to the local caches.
async fn consume_events(mut events: EventStream, matching: MatchingService) {
    while let Some(event) = events.next().await {
        matching.handle_event(&event).await;
    }
    warn!("event stream closed; remote cache invalidation stopped");
}

async fn source_of_record(settings: &Settings) -> Result<SourceOfRecord> {
    match settings.backend.storage {
        StorageBackend::Memory => {
            warn!("using in-memory storage; data is lost on restart");
            let store = MemoryStore::new();
            if let Some(path) = &settings.backend.seed_file {
                let seeded = seed_users(&store, path).await?;
                info!(path = %path, users = seeded, "seeded in-memory users");
            }
            Ok(SourceOfRecord {
                users: Arc::new(store.clone()),
                swipes: Arc::new(store.clone()),
                matches: Arc::new(store.clone()),
                selector: Arc::new(store),
            })
        }
        StorageBackend::Postgres => postgres(settings).await,
    }
}

async fn seed_users(store: &MemoryStore, path: &str) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading seed file {path}"))?;
    let users: Vec<ProfileDetails> =
        serde_json::from_str(&raw).with_context(|| format!("parsing seed file {path}"))?;
    let count = users.len();
    for details in users {
        store.insert_user(details);
    }
    Ok(count)
}

#[cfg(feature = "db-postgres")]
async fn postgres(settings: &Settings) -> Result<SourceOfRecord> {
    use secrecy::ExposeSecret;
    use storage_adapters::postgres::PgStore;

    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url is required for postgres storage")?;
    let store = PgStore::connect(url.expose_secret(), settings.database.max_connections)
        .await
        .context("connecting to postgres")?;
    Ok(SourceOfRecord {
        users: Arc::new(store.clone()),
        swipes: Arc::new(store.clone()),
        matches: Arc::new(store.clone()),
        selector: Arc::new(store),
    })
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres(_settings: &Settings) -> Result<SourceOfRecord> {
    anyhow::bail!("postgres storage requested but this build lacks the `db-postgres` feature")
}

async fn cache_layer(settings: &Settings) -> Result<CacheLayer> {
    match settings.backend.cache {
        CacheBackend::Memory => {
            let bus = MemoryEventBus::new();
            Ok(CacheLayer {
                profiles: Arc::new(MemoryProfileStore::new()),
                decks: Arc::new(MemoryDeckStore::new()),
                notifier: Arc::new(bus.clone()),
                events: bus.subscribe(),
            })
        }
        CacheBackend::Redis => redis(settings).await,
    }
}

#[cfg(feature = "redis")]
async fn redis(settings: &Settings) -> Result<CacheLayer> {
    use secrecy::ExposeSecret;
    use storage_adapters::redis::{connect_pool, subscribe, RedisCache, RedisEventNotifier};

    let url = settings
        .redis
        .url
        .as_ref()
        .context("redis.url is required for the redis cache")?;
    let pool = connect_pool(url.expose_secret(), settings.redis.pool_size)?;
    let cache = RedisCache::new(pool.clone());
    let events = subscribe(url.expose_secret(), &settings.events.channel_prefix)
        .await
        .context("subscribing to event channels")?;

    Ok(CacheLayer {
        profiles: Arc::new(cache.clone()),
        decks: Arc::new(cache),
        notifier: Arc::new(RedisEventNotifier::new(pool, settings.events.channel_prefix.clone())),
        events,
    })
}

#[cfg(not(feature = "redis"))]
async fn redis(_settings: &Settings) -> Result<CacheLayer> {
    anyhow::bail!("redis cache requested but this build lacks the `redis` feature")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
