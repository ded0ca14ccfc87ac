//! # Settlement Driver
//!
//! Packages channel terminal states for on-chain delivery and owns the
//! submission lifecycle (§4.3):
//!
//! - `request_checkpoint`/commit: a witnessed, advisory `(channel_id,
//!   nonce, state_hash, trader_sig, lp_sig)` that cannot be reverted by
//!   later off-chain traffic, batched by count or age before handing off
//!   to the submitter.
//! - `close`: marks the channel `settling`, stores the dual-signed final
//!   state, and drives `Submitted -> Confirmed|Failed` with retry backoff;
//!   exhaustion marks the channel `disputed` and raises an alert.
//! - Dispute staging: a higher-nonce dual-signed state submitted while a
//!   close is in flight is held rather than raced against it; resolving
//!   between the two is an explicit follow-up call.
//!
//! This crate holds no submission transport itself — it is generic over
//! [`ports::SettlementSubmitter`], with an in-process reference adapter
//! (`adapters::NoopSubmitter`) for single-node operation and tests.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::{
    CheckpointBatcher, ReceiptEvent, RetryState, SettlementConfig, SettlementDriver,
    SettlementError,
};
pub use ports::{SettlementReceipt, SettlementSubmitter};
