//! # Broadcast Bus
//!
//! Fans out channel updates and operator alerts (§4.2) to anyone
//! subscribed: the gateway's WebSocket handlers, the settlement driver
//! watching for checkpoints to submit, and any operator tooling.
//!
//! Delivery is at-least-once per subscriber; the
//! [`idempotency_cache::IdempotencyCache`] is how a consumer turns that
//! into effectively-once handling keyed on `(channel_id, nonce)`.

pub mod events;
pub mod idempotency_cache;
pub mod publisher;
pub mod subscriber;

pub use events::{AlertSeverity, CoordinatorEvent, EventFilter};
pub use idempotency_cache::IdempotencyCache;
pub use publisher::{EventPublisher, InMemoryEventBus, SharedBus, DEFAULT_CHANNEL_CAPACITY};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_reasonable() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1024);
    }
}
