//! Adapters implementing the settlement driver's outbound port.

mod noop_submitter;

pub use noop_submitter::NoopSubmitter;
