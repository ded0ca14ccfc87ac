//! Domain types for the operator API: configuration, error handling,
//! correlation ids, and the wire DTOs layered on top of the core entities.

pub mod config;
pub mod correlation;
pub mod error;
pub mod types;

pub use config::GatewayConfig;
pub use correlation::CorrelationId;
pub use error::GatewayError;
pub use types::*;
