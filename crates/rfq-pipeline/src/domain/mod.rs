//! # Domain Layer - Message Pipeline
//!
//! The six-stage inbound validation pipeline (§4.2) plus the config and
//! error types it is defined in terms of.
//!
//! - `entities`: `PipelineConfig`, the shape-check bounds
//! - `errors`: `PipelineError`
//! - `pipeline`: `MessagePipeline`, the per-channel lock + backpressure gate

pub mod entities;
pub mod errors;
pub mod pipeline;

pub use entities::*;
pub use errors::*;
pub use pipeline::*;
