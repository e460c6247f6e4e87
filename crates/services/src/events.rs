//! Best-effort delivery of domain events.

use std::sync::Arc;
use std::time::Duration;

use domains::ports::{EventNotifier, NotifyError};
use domains::DomainEvent;
use tracing::{debug, warn};

/// Wraps the notifier port with a deadline. Failures are logged and dropped:
/// the operation that produced the event has already committed.
#[derive(Clone)]
pub struct EventEmitter {
    notifier: Arc<dyn EventNotifier>,
    timeout: Duration,
}

impl EventEmitter {
    pub fn new(notifier: Arc<dyn EventNotifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// Returns whether the notifier accepted the event.
    pub async fn emit(&self, event: DomainEvent) -> bool {
        let result = tokio::time::timeout(self.timeout, self.notifier.publish(&event))
            .await
            .unwrap_or(Err(NotifyError::Timeout));

        match result {
            Ok(()) => {
                debug!(topic = event.topic(), "event published");
                true
            }
            Err(err) => {
                warn!(topic = event.topic(), error = %err, ?event, "event dropped");
                false
            }
        }
    }
}
