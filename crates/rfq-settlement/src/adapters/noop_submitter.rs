//! In-process reference submitter. Records every submission and always
//! reports confirmation, matching the role of a real on-chain submitter
//! (out of scope, §4.3) closely enough for tests and single-node operation.

use crate::ports::outbound::{SettlementReceipt, SettlementSubmitter};
use async_trait::async_trait;
use rfq_types::{Checkpoint, SettlementRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;

#[derive(Default)]
pub struct NoopSubmitter {
    next_id: AtomicU64,
    checkpoint_batches: RwLock<Vec<Vec<Checkpoint>>>,
    settlements: RwLock<Vec<SettlementRequest>>,
}

impl NoopSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint_batches(&self) -> Vec<Vec<Checkpoint>> {
        self.checkpoint_batches.read().clone()
    }

    pub fn settlements(&self) -> Vec<SettlementRequest> {
        self.settlements.read().clone()
    }

    fn next_submission_id(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("noop-{id}")
    }
}

#[async_trait]
impl SettlementSubmitter for NoopSubmitter {
    async fn submit_checkpoints(&self, batch: Vec<Checkpoint>) -> SettlementReceipt {
        let submission_id = self.next_submission_id();
        self.checkpoint_batches.write().push(batch);
        SettlementReceipt { submission_id, confirmed: true }
    }

    async fn submit_settlement(&self, request: &SettlementRequest) -> SettlementReceipt {
        let submission_id = self.next_submission_id();
        self.settlements.write().push(request.clone());
        SettlementReceipt { submission_id, confirmed: true }
    }
}
