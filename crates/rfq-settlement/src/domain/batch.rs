//! Checkpoint batching (§4.3): group pending checkpoints into a single
//! on-chain submission once a count or age threshold is met.

use rfq_types::Checkpoint;
use std::collections::VecDeque;

/// Accumulates dual-signed checkpoints awaiting a batched submission.
/// Checkpoints themselves are advisory — batching only affects when they
/// are handed to the submitter, never whether a channel is considered
/// checkpointed.
#[derive(Debug, Default)]
pub struct CheckpointBatcher {
    pending: VecDeque<Checkpoint>,
}

impl CheckpointBatcher {
    pub fn new() -> Self {
        Self { pending: VecDeque::new() }
    }

    pub fn push(&mut self, checkpoint: Checkpoint) {
        self.pending.push_back(checkpoint);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Oldest pending checkpoint's age relative to `now_ms`, or 0 if empty.
    pub fn oldest_age_ms(&self, now_ms: u64) -> u64 {
        self.pending.front().map(|c| now_ms.saturating_sub(c.created_at)).unwrap_or(0)
    }

    pub fn should_flush(&self, batch_size: usize, batch_age_ms: u64, now_ms: u64) -> bool {
        !self.is_empty() && (self.len() >= batch_size || self.oldest_age_ms(now_ms) >= batch_age_ms)
    }

    /// Drains every pending checkpoint into a single batch for submission.
    pub fn flush(&mut self) -> Vec<Checkpoint> {
        self.pending.drain(..).collect()
    }
}
