//! # Coordinator Events
//!
//! Defines the events that flow through the bus (§4.2): a channel update
//! fan-out to every interested subscriber, plus operator alerts raised when
//! the coordinator needs a human (store exhausted retries, a channel went
//! disputed).

use rfq_types::{Channel, ChannelId, Message};
use serde::{Deserialize, Serialize};

/// All events published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinatorEvent {
    /// A channel accepted a message and moved to a new state (§4.2:
    /// broadcast `(channel_id, new_state, message)`, at-least-once).
    ChannelUpdated {
        channel_id: ChannelId,
        new_state: Box<Channel>,
        message: Box<Message>,
    },
    /// Raised when a store write keeps failing after the retry budget is
    /// spent and the channel has been marked `disputed` (§4.1 failure
    /// semantics), or when an operator-visible anomaly needs attention.
    OperatorAlert {
        channel_id: ChannelId,
        reason: String,
        severity: AlertSeverity,
    },
}

impl CoordinatorEvent {
    /// The channel this event concerns, for filtering.
    pub fn channel_id(&self) -> ChannelId {
        match self {
            CoordinatorEvent::ChannelUpdated { channel_id, .. } => *channel_id,
            CoordinatorEvent::OperatorAlert { channel_id, .. } => *channel_id,
        }
    }

    /// The `(channel_id, nonce)` key a subscriber dedups on, if this event
    /// carries a nonce-advancing message.
    pub fn idempotency_key(&self) -> Option<(ChannelId, u64)> {
        match self {
            CoordinatorEvent::ChannelUpdated { channel_id, message, .. } => {
                Some((*channel_id, message.nonce()))
            }
            CoordinatorEvent::OperatorAlert { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

/// Subscriber-side filter: all events, a single channel, or alerts only.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub channel_id: Option<ChannelId>,
    pub alerts_only: bool,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_channel(channel_id: ChannelId) -> Self {
        Self { channel_id: Some(channel_id), alerts_only: false }
    }

    pub fn alerts() -> Self {
        Self { channel_id: None, alerts_only: true }
    }

    pub fn matches(&self, event: &CoordinatorEvent) -> bool {
        if self.alerts_only && !matches!(event, CoordinatorEvent::OperatorAlert { .. }) {
            return false;
        }
        match self.channel_id {
            Some(id) => id == event.channel_id(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfq_types::ChannelId;

    fn alert(channel_id: ChannelId) -> CoordinatorEvent {
        CoordinatorEvent::OperatorAlert {
            channel_id,
            reason: "test".into(),
            severity: AlertSeverity::Warning,
        }
    }

    #[test]
    fn filter_for_channel_excludes_other_channels() {
        let filter = EventFilter::for_channel(ChannelId(1));
        assert!(filter.matches(&alert(ChannelId(1))));
        assert!(!filter.matches(&alert(ChannelId(2))));
    }

    #[test]
    fn alerts_only_filter_excludes_channel_updates() {
        let filter = EventFilter::alerts();
        assert!(filter.matches(&alert(ChannelId(1))));
    }
}
