use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast publisher for batch lifecycle events.
///
/// Observers (an HTTP layer pushing websocket updates, audit sinks) attach
/// via `subscribe`; publishing never blocks orchestration and tolerates
/// having no subscribers at all.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<OrchestrationEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct OrchestrationEvent {
    /// Event name, one of the `constants::events` strings
    pub name: String,
    /// Batch the event concerns
    pub batch_id: Uuid,
    /// Event-specific payload (item index, error message, counts)
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a lifecycle event for a batch.
    pub fn publish(&self, event_name: impl Into<String>, batch_id: Uuid, context: Value) {
        let event = OrchestrationEvent {
            name: event_name.into(),
            batch_id,
            context,
            published_at: chrono::Utc::now(),
        };

        // A send error just means nobody is subscribed right now; lifecycle
        // progress must not depend on observers being attached.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::system::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
