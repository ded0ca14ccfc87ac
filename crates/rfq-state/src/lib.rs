//! # Channel State Machine
//!
//! Holds the single authoritative record for each open RFQ channel and
//! applies every transition named in §4.1: `open`, `apply_message`,
//! `request_checkpoint`/`commit_checkpoint`, `close`/`mark_closed`,
//! `mark_timed_out`.
//!
//! ## Domain invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Nonce monotonicity | `ChannelStateMachine::apply_message` |
//! | Timestamp monotonicity + skew window | `ChannelStateMachine::check_timestamp` |
//! | Balance non-negativity | `ChannelStateMachine::apply_fill` (checked_sub) |
//! | Dual-signed checkpoints/settlement | `rfq-crypto` recovery against both participants |
//!
//! This crate holds no I/O: it is generic over [`rfq_store::ChannelStore`]
//! and calls into `rfq-crypto` for signature recovery and hashing. Locking,
//! retries, and broadcast live one layer up in `rfq-pipeline`.

pub mod domain;

pub use domain::{ChannelStateMachine, StateConfig, StateError};
