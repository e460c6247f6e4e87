use std::sync::Arc;

use async_trait::async_trait;
use domains::ports::{EventNotifier, NotifyError};
use domains::DomainEvent;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use crate::EventStream;

const CHANNEL_CAPACITY: usize = 1024;

/// In-process pub/sub. A bus built with [`MemoryEventBus::recording`] also
/// keeps every published event for later inspection; [`MemoryEventBus::new`]
/// keeps nothing beyond the broadcast buffer.
#[derive(Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<DomainEvent>,
    history: Option<Arc<Mutex<Vec<DomainEvent>>>>,
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: None,
        }
    }

    /// A bus that remembers everything it publishes. Unbounded; meant for tests.
    pub fn recording() -> Self {
        Self {
            history: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Self::new()
        }
    }

    /// Events published so far. Always empty unless built with `recording`.
    pub async fn published(&self) -> Vec<DomainEvent> {
        match &self.history {
            Some(history) => history.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Events published from now on. Lagging subscribers skip what they missed.
    pub fn subscribe(&self) -> EventStream {
        stream::unfold(self.sender.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[async_trait]
impl EventNotifier for MemoryEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        if let Some(history) = &self.history {
            history.lock().await.push(event.clone());
        }
        // No receivers is not an error: nobody is listening yet.
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}
