//! Operator API gateway: the HTTP/WebSocket boundary over the coordinator
//! core.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  OPERATOR GATEWAY                     │
//! ├──────────────────────────────────────────────────────┤
//! │              REST + /ws  (single listener)            │
//! │  ┌──────────────────────────────────────────────┐    │
//! │  │            Middleware Stack                    │    │
//! │  │   Cors → Tracing → Timeout → RateLimit         │    │
//! │  └────────────────────┬───────────────────────────┘    │
//! │                       │                                │
//! │  ┌────────────────────┴───────────────────────┐       │
//! │  │                GatewayState                  │       │
//! │  │   machine · pipeline · settlement · store    │       │
//! │  └────────────────────┬───────────────────────┘       │
//! └───────────────────────┼────────────────────────────────┘
//!                         │
//!                    Event Bus
//!                         │
//!              rfq-state / rfq-pipeline / rfq-settlement
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rfq_gateway::{GatewayConfig, GatewayService, GatewayState};
//!
//! let config = GatewayConfig::default();
//! let mut service = GatewayService::new(config, state)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod service;
pub mod ws;

pub use domain::config::GatewayConfig;
pub use domain::error::GatewayError;
pub use domain::types::*;
pub use router::GatewayState;
pub use service::GatewayService;
