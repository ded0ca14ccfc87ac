//! # Channel Store
//!
//! The store contract the coordinator core is written against (§4.4),
//! plus a single-node in-memory adapter. Durable channel records, an
//! append-only message log keyed by `(channel_id, nonce)`, a participants
//! secondary index, and TTL-bounded per-channel locking.

pub mod errors;
pub mod memory;
pub mod traits;

pub use errors::StoreError;
pub use memory::InMemoryChannelStore;
pub use traits::{ChannelStore, ChannelWrite, LockOutcome};
