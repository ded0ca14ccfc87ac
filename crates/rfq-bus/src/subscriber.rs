//! # Event Subscriber
//!
//! Defines the subscribing side of the bus.

use crate::events::{CoordinatorEvent, EventFilter};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("event bus closed")]
    Closed,
}

pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// A subscription handle. Delivery is at-least-once: a lagged receiver
/// skips ahead rather than erroring, so callers that need exactly-once
/// semantics must dedup on `event.idempotency_key()` themselves (see
/// [`crate::idempotency_cache::IdempotencyCache`]).
pub struct Subscription {
    receiver: broadcast::Receiver<CoordinatorEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<CoordinatorEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    pub async fn recv(&mut self) -> Option<CoordinatorEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "subscriber lagged, events dropped");
                    continue;
                }
            };
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<Option<CoordinatorEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };
            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// Stream adapter for subscriptions, for use with `tokio_stream` combinators.
pub struct EventStream {
    subscription: Subscription,
}

impl EventStream {
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    pub fn filter(&self) -> &EventFilter {
        self.subscription.filter()
    }
}

impl Stream for EventStream {
    type Item = CoordinatorEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.subscription.try_recv() {
            Ok(Some(event)) => Poll::Ready(Some(event)),
            Ok(None) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Err(SubscriptionError::Closed) => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AlertSeverity;
    use crate::publisher::{EventPublisher, InMemoryEventBus};
    use rfq_types::ChannelId;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn recv_waits_for_matching_event() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        bus.publish(CoordinatorEvent::OperatorAlert {
            channel_id: ChannelId(1),
            reason: "x".into(),
            severity: AlertSeverity::Critical,
        })
        .await;
        let received = timeout(Duration::from_millis(100), sub.recv()).await.unwrap().unwrap();
        assert_eq!(received.channel_id(), ChannelId(1));
    }

    #[tokio::test]
    async fn try_recv_empty_returns_none() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn dropping_subscription_decrements_receiver_count() {
        let bus = InMemoryEventBus::new();
        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }
}
