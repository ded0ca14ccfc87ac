//! Driven port for on-chain settlement delivery (§4.3 close flow,
//! explicitly out of scope to implement: "hands off a settlement-submission
//! job to an external submitter").

use async_trait::async_trait;
use rfq_types::{Checkpoint, SettlementRequest};

/// Opaque receipt a submitter hands back; the driver polls or is called
/// back with these to drive `Submitted -> Confirmed|Failed`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub submission_id: String,
    pub confirmed: bool,
}

#[async_trait]
pub trait SettlementSubmitter: Send + Sync {
    /// Submits a batch of checkpoints (§4.3 batching by count or age).
    async fn submit_checkpoints(&self, batch: Vec<Checkpoint>) -> SettlementReceipt;

    /// Submits a final dual-signed settlement for one channel.
    async fn submit_settlement(&self, request: &SettlementRequest) -> SettlementReceipt;
}
