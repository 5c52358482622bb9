//! Event broadcaster shared by every Wardflow component.
//!
//! Built on tokio's broadcast channel: multi-producer, multi-consumer, with
//! bounded buffering. The catalog publishes its bed-status audit feed here
//! and the coordinator publishes the coarse per-operation events; consumers
//! filter by `DomainEventKind`.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::DomainEvent;

/// Default buffer size for the broadcast channel. Slow receivers lagging
/// past this many events start losing the oldest ones.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Broadcaster for domain events.
///
/// Cheap to clone and share; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with the default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with a custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 when nobody is
    /// listening (which is not an error — event consumption is optional).
    pub fn send(&self, event: DomainEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Whether anyone is listening.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
