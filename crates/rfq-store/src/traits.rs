//! # Channel Store Contract
//!
//! The coordinator core treats the store as an external collaborator
//! (§4.4): durable channel records, an append-only message log keyed by
//! `(channel_id, nonce)`, a participants secondary index, and per-channel
//! mutual exclusion with TTL-bounded leases. Everything in `rfq-state` and
//! `rfq-pipeline` is written against this trait, never against a concrete
//! backend.

use crate::errors::StoreError;
use rfq_types::{Address, Channel, ChannelId, Message};
use std::time::Duration;

/// A channel record plus the message that produced it, written together so
/// a crash between the two never leaves one without the other.
#[derive(Debug, Clone)]
pub struct ChannelWrite {
    pub channel_id: ChannelId,
    pub record: Channel,
    pub message_nonce: u64,
    pub message: Message,
}

/// Outcome of a lock acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Acquired,
    HeldByOther,
}

pub trait ChannelStore: Send + Sync {
    /// Fetches the current record, or `None` if the channel has never been opened.
    fn get(&self, channel_id: ChannelId) -> Result<Option<Channel>, StoreError>;

    /// Last-write-wins upsert of a channel record.
    fn put(&self, channel_id: ChannelId, record: Channel) -> Result<(), StoreError>;

    /// Atomically commits a batch of channel-record + message-log writes:
    /// either every write lands, or none do.
    fn transactional_put_many(&self, writes: Vec<ChannelWrite>) -> Result<(), StoreError>;

    /// Appends a message to the log at `(channel_id, nonce)`. Rejects a
    /// second write at a nonce already present (§4.2 idempotent replay).
    fn append_message(
        &self,
        channel_id: ChannelId,
        nonce: u64,
        payload: Message,
    ) -> Result<(), StoreError>;

    /// Returns the message previously appended at `(channel_id, nonce)`, if any.
    fn get_message(&self, channel_id: ChannelId, nonce: u64) -> Result<Option<Message>, StoreError>;

    /// Attempts to acquire the per-channel lock for `ttl`. The lease expires
    /// automatically if never released.
    fn acquire_lock(
        &self,
        channel_id: ChannelId,
        owner_token: &str,
        ttl: Duration,
    ) -> Result<LockOutcome, StoreError>;

    /// Releases a lock. Fails if `owner_token` does not match the current holder.
    fn release_lock(&self, channel_id: ChannelId, owner_token: &str) -> Result<(), StoreError>;

    /// Channels in which `participant` is the trader or the LP.
    fn channels_for_participant(&self, participant: Address) -> Result<Vec<ChannelId>, StoreError>;

    /// Every channel ever opened. Used by the timer wheel to scan for
    /// `timeout_at` expiry; not on any hot path.
    fn all_channel_ids(&self) -> Result<Vec<ChannelId>, StoreError>;
}
