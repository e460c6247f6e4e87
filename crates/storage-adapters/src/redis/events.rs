use async_trait::async_trait;
use deadpool_redis::redis;
use deadpool_redis::Pool;
use domains::ports::{EventNotifier, NotifyError};
use domains::DomainEvent;
use futures_util::StreamExt;
use tracing::{info, warn};

use crate::EventStream;

/// Channels a replica listens on. `swipe-processed` is outbound only.
const TOPICS: [&str; 2] = ["match-created", "profile-updated"];

fn channel(prefix: &str, topic: &str) -> String {
    format!("{prefix}:{topic}")
}

/// Publishes events on `{prefix}:{topic}`.
#[derive(Clone)]
pub struct RedisEventNotifier {
    pool: Pool,
    prefix: String,
}

impl RedisEventNotifier {
    pub fn new(pool: Pool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl EventNotifier for RedisEventNotifier {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(event).map_err(|err| NotifyError::Serialization(err.to_string()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| NotifyError::Unavailable(err.to_string()))?;
        let _receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel(&self.prefix, event.topic()))
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|err| NotifyError::Unavailable(err.to_string()))?;
        Ok(())
    }
}

/// Opens a dedicated pub/sub connection and yields every event published
/// under `prefix`. Undecodable payloads are logged and skipped.
pub async fn subscribe(url: &str, prefix: &str) -> Result<EventStream, NotifyError> {
    let unavailable = |err: redis::RedisError| NotifyError::Unavailable(err.to_string());

    let client = redis::Client::open(url).map_err(unavailable)?;
    let mut pubsub = client.get_async_pubsub().await.map_err(unavailable)?;
    for topic in TOPICS {
        pubsub
            .subscribe(channel(prefix, topic))
            .await
            .map_err(unavailable)?;
    }
    info!(prefix, "subscribed to event channels");

    let events = pubsub.into_on_message().filter_map(|message| async move {
        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(channel = message.get_channel_name(), error = %err, "unreadable event payload");
                return None;
            }
        };
        match serde_json::from_str::<DomainEvent>(&payload) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(channel = message.get_channel_name(), error = %err, "undecodable event");
                None
            }
        }
    });
    Ok(events.boxed())
}
