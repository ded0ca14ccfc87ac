//! # State Machine Configuration
//!
//! Tunables the channel state machine is parameterized over (§6 configuration
//! options). Defaults match the literal values named in the specification;
//! `rfq-node` overrides them from environment at startup.

/// Configuration for a [`crate::domain::machine::ChannelStateMachine`].
#[derive(Clone, Debug)]
pub struct StateConfig {
    /// Clock skew tolerated between a message's `timestamp` and wall clock
    /// before it is rejected as stale.
    pub skew_window_ms: u64,
    /// Minimum `timeout_ms` accepted by `open` (`timeout_too_short` below this).
    pub timeout_floor_ms: u64,
    /// Chain id embedded in the domain separator and `ChannelState` snapshots.
    pub chain_id: u64,
    /// Contract address embedded in the domain separator (zero if none).
    pub verifying_contract: rfq_types::Address,
    /// Maximum slippage a `QuoteRequest` may specify.
    pub max_slippage_bps: u16,
    /// Maximum fee an LP `Quote` may specify.
    pub max_fee_bps: u16,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            skew_window_ms: 30_000,
            timeout_floor_ms: 60_000,
            chain_id: 1,
            verifying_contract: [0u8; 20],
            max_slippage_bps: 1_000,
            max_fee_bps: 500,
        }
    }
}
