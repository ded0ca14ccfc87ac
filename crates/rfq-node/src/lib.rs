//! # Node Runtime Library
//!
//! Exposes the coordinator binary's internal modules for integration
//! testing. The entry point is the `main.rs` binary.

pub mod container;
pub mod timer;

pub use container::{NodeConfig, NodeContainer};
pub use timer::TimerWheel;
