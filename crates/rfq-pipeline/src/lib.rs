//! # Message Pipeline
//!
//! Inbound entry point for every channel message. Runs the six-stage
//! validation chain: shape (stage 1, checked here before any lock),
//! then channel lookup / participant match / signature / ordering /
//! semantic (stages 2-6, folded into [`rfq_state::ChannelStateMachine::apply_message`]
//! under a per-channel distributed lock). Bounds queue depth per
//! channel and total in-flight validations for back-pressure, retries
//! lock contention and transient store errors with backoff, and
//! broadcasts the resulting state on [`rfq_bus`] once a message is
//! applied.
//!
//! This crate holds no transport or wire-format code — that lives in
//! `rfq-gateway`. It owns only the validation/serialization/broadcast
//! pipeline between "a `Message` arrived" and "the channel's new state
//! is durable and published".

pub mod domain;

pub use domain::{MessagePipeline, PipelineConfig, PipelineError};
