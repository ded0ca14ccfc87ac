//! Middleware stack for the operator API.
//!
//! Layer order: Request → RateLimit → Tracing → Handler.

pub mod cors;
pub mod rate_limit;
pub mod tracing;

pub use cors::create_cors_layer;
pub use rate_limit::{RateLimitLayer, RateLimitState};
pub use tracing::TracingLayer;

use crate::domain::config::GatewayConfig;
use std::sync::Arc;

/// Middleware stack builder.
pub struct MiddlewareStack {
    pub rate_limit: RateLimitLayer,
    pub tracing: TracingLayer,
}

impl MiddlewareStack {
    /// Build the middleware stack from gateway config.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            rate_limit: RateLimitLayer::new(config.rate_limit.clone()),
            tracing: TracingLayer::new(),
        }
    }

    /// Rate limit state, shared with the background cleanup task.
    pub fn rate_limit_state(&self) -> Arc<RateLimitState> {
        self.rate_limit.state()
    }
}
