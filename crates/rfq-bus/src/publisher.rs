//! # Event Publisher
//!
//! Defines the publishing side of the bus.

use crate::events::{CoordinatorEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of buffered events per subscriber before lag kicks in.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Publishing side of the bus: `rfq-pipeline` calls this after every
/// successfully applied message.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event, returning the number of subscribers it reached.
    async fn publish(&self, event: CoordinatorEvent) -> usize;

    fn events_published(&self) -> u64;
}

/// In-memory bus backed by `tokio::sync::broadcast`. Fine for a single
/// coordinator process; a distributed deployment would swap this for a
/// durable transport behind the same trait.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<CoordinatorEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, events_published: AtomicU64::new(0), capacity }
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        debug!(?filter, "new bus subscription");
        Subscription::new(receiver, filter)
    }

    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: CoordinatorEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        // No active receivers is not an error: a dead subscriber doesn't
        // block message processing (§4.2 broadcast is fire-and-forget per
        // consumer, at-least-once with idempotent replay on reconnect).
        self.sender.send(event).unwrap_or(0)
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

/// Shared handle to a bus, cloned into every component that publishes.
pub type SharedBus = Arc<InMemoryEventBus>;
