//! Driven ports (outbound dependencies) for the settlement driver.

pub mod outbound;

pub use outbound::{SettlementReceipt, SettlementSubmitter};
