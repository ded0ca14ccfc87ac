//! # Idempotency Cache
//!
//! At-least-once delivery (§4.2) means a subscriber can see the same
//! `(channel_id, nonce)` twice after a redelivery. This cache lets a
//! subscriber recognize and drop the duplicate without re-applying it.

use rfq_types::ChannelId;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time-bounded cache of `(channel_id, nonce)` pairs already delivered.
pub struct IdempotencyCache {
    seen: HashMap<(ChannelId, u64), u64>,
    retention_secs: u64,
    last_gc: u64,
}

impl IdempotencyCache {
    pub const DEFAULT_RETENTION_SECS: u64 = 300;

    pub fn new() -> Self {
        Self::with_retention(Self::DEFAULT_RETENTION_SECS)
    }

    pub fn with_retention(retention_secs: u64) -> Self {
        Self { seen: HashMap::new(), retention_secs, last_gc: Self::now() }
    }

    /// Records `key` as delivered and reports whether it had already been
    /// seen. Call once per inbound delivery before acting on it.
    pub fn observe(&mut self, key: (ChannelId, u64)) -> bool {
        self.maybe_gc();
        let now = Self::now();
        self.seen.insert(key, now).is_some()
    }

    fn maybe_gc(&mut self) {
        let now = Self::now();
        if now.saturating_sub(self.last_gc) < 10 {
            return;
        }
        let retention = self.retention_secs;
        self.seen.retain(|_, seen_at| now.saturating_sub(*seen_at) <= retention);
        self.last_gc = now;
    }

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_not_a_duplicate() {
        let mut cache = IdempotencyCache::new();
        assert!(!cache.observe((ChannelId(1), 1)));
    }

    #[test]
    fn repeat_observation_is_a_duplicate() {
        let mut cache = IdempotencyCache::new();
        assert!(!cache.observe((ChannelId(1), 1)));
        assert!(cache.observe((ChannelId(1), 1)));
    }

    #[test]
    fn distinct_nonces_are_independent() {
        let mut cache = IdempotencyCache::new();
        assert!(!cache.observe((ChannelId(1), 1)));
        assert!(!cache.observe((ChannelId(1), 2)));
    }
}
