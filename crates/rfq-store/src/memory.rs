//! # In-Memory Reference Store
//!
//! A single-node implementation of [`ChannelStore`] backed by
//! `parking_lot::RwLock`-guarded maps, plus a `DashMap` lock table that
//! simulates the distributed per-channel lease a multi-node deployment
//! would take from an external coordinator (§9 design note: single-node
//! locking today, swappable later without touching callers).

use crate::errors::StoreError;
use crate::traits::{ChannelStore, ChannelWrite, LockOutcome};
use dashmap::DashMap;
use parking_lot::RwLock;
use rfq_types::{Address, Channel, ChannelId, Message};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

struct LockEntry {
    owner_token: String,
    expires_at: Instant,
}

/// In-memory `ChannelStore`. Used by the single-node binary and by every
/// test suite that replays the seed scenarios against a real store
/// interface rather than a hand-rolled test double.
pub struct InMemoryChannelStore {
    channels: RwLock<HashMap<ChannelId, Channel>>,
    messages: RwLock<HashMap<(ChannelId, u64), Message>>,
    participants: RwLock<HashMap<Address, HashSet<ChannelId>>>,
    locks: DashMap<ChannelId, LockEntry>,
}

impl InMemoryChannelStore {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            participants: RwLock::new(HashMap::new()),
            locks: DashMap::new(),
        }
    }

    fn index_participants(participants: &RwLock<HashMap<Address, HashSet<ChannelId>>>, record: &Channel) {
        let mut index = participants.write();
        index.entry(record.trader).or_default().insert(record.channel_id);
        index.entry(record.lp).or_default().insert(record.channel_id);
    }
}

impl Default for InMemoryChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStore for InMemoryChannelStore {
    fn get(&self, channel_id: ChannelId) -> Result<Option<Channel>, StoreError> {
        Ok(self.channels.read().get(&channel_id).cloned())
    }

    fn put(&self, channel_id: ChannelId, record: Channel) -> Result<(), StoreError> {
        Self::index_participants(&self.participants, &record);
        self.channels.write().insert(channel_id, record);
        Ok(())
    }

    fn transactional_put_many(&self, writes: Vec<ChannelWrite>) -> Result<(), StoreError> {
        let mut messages = self.messages.write();

        for write in &writes {
            let key = (write.channel_id, write.message_nonce);
            if messages.contains_key(&key) {
                return Err(StoreError::DuplicateMessage {
                    channel_id: write.channel_id,
                    nonce: write.message_nonce,
                });
            }
        }

        let mut channels = self.channels.write();
        for write in writes {
            Self::index_participants(&self.participants, &write.record);
            channels.insert(write.channel_id, write.record);
            messages.insert((write.channel_id, write.message_nonce), write.message);
        }

        Ok(())
    }

    fn append_message(
        &self,
        channel_id: ChannelId,
        nonce: u64,
        payload: Message,
    ) -> Result<(), StoreError> {
        let mut messages = self.messages.write();
        let key = (channel_id, nonce);
        if messages.contains_key(&key) {
            return Err(StoreError::DuplicateMessage { channel_id, nonce });
        }
        messages.insert(key, payload);
        Ok(())
    }

    fn get_message(&self, channel_id: ChannelId, nonce: u64) -> Result<Option<Message>, StoreError> {
        Ok(self.messages.read().get(&(channel_id, nonce)).cloned())
    }

    fn acquire_lock(
        &self,
        channel_id: ChannelId,
        owner_token: &str,
        ttl: Duration,
    ) -> Result<LockOutcome, StoreError> {
        let now = Instant::now();

        match self.locks.get(&channel_id) {
            Some(entry) if entry.expires_at > now && entry.owner_token != owner_token => {
                return Ok(LockOutcome::HeldByOther);
            }
            _ => {}
        }

        self.locks.insert(
            channel_id,
            LockEntry {
                owner_token: owner_token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(LockOutcome::Acquired)
    }

    fn release_lock(&self, channel_id: ChannelId, owner_token: &str) -> Result<(), StoreError> {
        match self.locks.get(&channel_id) {
            Some(entry) if entry.owner_token == owner_token => {
                drop(entry);
                self.locks.remove(&channel_id);
                Ok(())
            }
            Some(_) => Err(StoreError::LockNotOwned {
                channel_id,
                owner_token: owner_token.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn channels_for_participant(&self, participant: Address) -> Result<Vec<ChannelId>, StoreError> {
        Ok(self
            .participants
            .read()
            .get(&participant)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn all_channel_ids(&self) -> Result<Vec<ChannelId>, StoreError> {
        Ok(self.channels.read().keys().copied().collect())
    }
}
