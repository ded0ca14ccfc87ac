//! # Subsystem Container
//!
//! Central container holding the wired coordinator core with dependency
//! injection for the gateway and the timer wheel.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig};
pub use subsystems::NodeContainer;
