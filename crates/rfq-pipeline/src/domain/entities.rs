//! Pipeline configuration and the bounds stage 1 (shape) checks against.

use std::time::Duration;

/// Tunables for [`crate::domain::pipeline::MessagePipeline`] (§5, §6).
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Per-channel lock lease (§4.4 `acquire_lock`).
    pub lock_ttl: Duration,
    /// Inbound messages queued before a channel is rejected as `overloaded`.
    pub max_queue_depth: usize,
    /// Concurrent in-flight validations across all channels.
    pub max_in_flight: usize,
    pub max_slippage_bps: u16,
    pub max_fee_bps: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_millis(30_000),
            max_queue_depth: 256,
            max_in_flight: 64,
            max_slippage_bps: 1_000,
            max_fee_bps: 500,
        }
    }
}
