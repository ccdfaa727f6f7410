//! In-process notifier backed by a tokio broadcast channel

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::errors::NotifyError;
use crate::domain::repositories::notifier::{NotificationEvent, Notifier};

/// Event as delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub event: NotificationEvent,
}

pub struct BroadcastNotifier {
    tx: broadcast::Sender<Published>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event published from now on. Slow subscribers lag and
    /// lose the oldest events rather than blocking publishers.
    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn publish(&self, topic: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event).map_err(|e| NotifyError::Rejected {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;
        info!(topic = %topic, "Publishing {}", payload);

        let message = Published {
            topic: topic.to_string(),
            event: event.clone(),
        };
        if self.tx.send(message).is_err() {
            debug!(topic = %topic, "No subscribers for event");
        }
        Ok(())
    }
}
