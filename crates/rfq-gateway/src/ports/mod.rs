//! Port traits the gateway depends on but does not implement itself.

pub mod outbound;

pub use outbound::{SystemTimeSource, TimeSource};
