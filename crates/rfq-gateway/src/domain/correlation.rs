//! Request/log correlation ids.
//!
//! Every inbound HTTP request and WebSocket connection gets one of these so
//! a single request can be traced across the tracing span and any error it
//! produces. UUID v7 keeps ids roughly time-ordered, which is handy when
//! grepping logs for "what happened around this time".

use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// The millisecond timestamp embedded in a v7 id's first 48 bits.
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        let mut ms = [0u8; 8];
        ms[2..8].copy_from_slice(&bytes[0..6]);
        u64::from_be_bytes(ms)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_close_to_embedding_time() {
        let id = CorrelationId::new();
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let delta = now_ms.abs_diff(id.timestamp_ms());
        assert!(delta < 5_000, "correlation id timestamp drifted by {delta}ms");
    }

    #[test]
    fn distinct_ids_are_not_equal() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }
}
