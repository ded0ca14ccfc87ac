//! Settlement driver configuration.

/// Tunables for [`crate::domain::driver::SettlementDriver`] (§4.3).
#[derive(Clone, Debug)]
pub struct SettlementConfig {
    /// Checkpoints batched into one on-chain submission once this many are
    /// pending for distinct channels.
    pub checkpoint_batch_size: usize,
    /// ...or once the oldest pending checkpoint in the batch is this old,
    /// whichever comes first.
    pub checkpoint_batch_age_ms: u64,
    /// Failed settlement submissions retried with exponential backoff up to
    /// this many attempts before the channel is marked `disputed`.
    pub max_submission_attempts: u32,
    /// Base delay for the submission retry backoff.
    pub submission_retry_base_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            checkpoint_batch_size: 16,
            checkpoint_batch_age_ms: 10_000,
            max_submission_attempts: 5,
            submission_retry_base_ms: 500,
        }
    }
}
