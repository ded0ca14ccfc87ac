//! # Settlement Driver
//!
//! Owns the checkpoint and close/settlement lifecycle (§4.3) on top of
//! [`rfq_state::ChannelStateMachine`]. Checkpoints are witnessed, advisory
//! snapshots; close starts a dual-signed final-state submission that is
//! retried with backoff and, on exhaustion, escalated to a dispute.

use crate::domain::batch::CheckpointBatcher;
use crate::domain::entities::SettlementConfig;
use crate::domain::errors::SettlementError;
use crate::domain::retry::{ReceiptEvent, RetryState};
use crate::ports::outbound::SettlementSubmitter;
use dashmap::DashMap;
use rfq_crypto::{hash_channel_state, recover_signer, DomainSeparator};
use rfq_state::ChannelStateMachine;
use rfq_store::ChannelStore;
use rfq_types::{
    Checkpoint, ChannelId, ChannelStateSnapshot, ChannelStatus, SettlementRequest,
    SubmissionStatus,
};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct SettlementDriver<S: ChannelStore> {
    machine: Arc<ChannelStateMachine<S>>,
    submitter: Arc<dyn SettlementSubmitter>,
    config: SettlementConfig,
    domain: DomainSeparator,
    batcher: parking_lot::Mutex<CheckpointBatcher>,
    settlements: DashMap<ChannelId, (SettlementRequest, RetryState)>,
}

impl<S: ChannelStore + 'static> SettlementDriver<S> {
    pub fn new(
        machine: Arc<ChannelStateMachine<S>>,
        submitter: Arc<dyn SettlementSubmitter>,
        config: SettlementConfig,
        domain: DomainSeparator,
    ) -> Self {
        Self {
            machine,
            submitter,
            config,
            domain,
            batcher: parking_lot::Mutex::new(CheckpointBatcher::new()),
            settlements: DashMap::new(),
        }
    }

    /// `request_checkpoint`: transitions the channel to `checkpointing`,
    /// verifies the dual signature over the state hash, and stages the
    /// witnessed checkpoint for batched submission.
    pub fn request_checkpoint(
        &self,
        channel_id: ChannelId,
        trader_signature: [u8; 65],
        lp_signature: [u8; 65],
        now_ms: u64,
    ) -> Result<Checkpoint, SettlementError> {
        let channel = self.machine.request_checkpoint(channel_id, now_ms)?;
        let snapshot = ChannelStateSnapshot::from_channel(&channel, self.domain.chain_id, now_ms);
        let state_hash = hash_channel_state(&snapshot, &self.domain);

        let trader_signer = recover_signer(&state_hash, &trader_signature)
            .map_err(|_| rfq_state::StateError::BadSignature(channel_id))?;
        let lp_signer = recover_signer(&state_hash, &lp_signature)
            .map_err(|_| rfq_state::StateError::BadSignature(channel_id))?;
        if trader_signer != channel.trader || lp_signer != channel.lp {
            return Err(SettlementError::State(rfq_state::StateError::BadSignature(channel_id)));
        }

        let checkpoint = Checkpoint {
            channel_id,
            nonce: channel.nonce,
            state_hash,
            trader_signature,
            lp_signature,
            created_at: now_ms,
        };
        self.batcher.lock().push(checkpoint.clone());
        self.machine.commit_checkpoint(channel_id)?;
        info!(%channel_id, nonce = channel.nonce, "checkpoint staged");
        Ok(checkpoint)
    }

    /// Flushes the pending checkpoint batch if the count or age threshold
    /// from `SettlementConfig` is met, submitting it as one unit.
    pub async fn flush_checkpoints_if_due(&self, now_ms: u64) -> Option<usize> {
        let due = {
            let batcher = self.batcher.lock();
            batcher.should_flush(
                self.config.checkpoint_batch_size,
                self.config.checkpoint_batch_age_ms,
                now_ms,
            )
        };
        if !due {
            return None;
        }
        let batch = self.batcher.lock().flush();
        let size = batch.len();
        let receipt = self.submitter.submit_checkpoints(batch).await;
        info!(submission_id = %receipt.submission_id, batch_size = size, "checkpoint batch submitted");
        Some(size)
    }

    /// `close`: transitions to `settling`, builds the final dual-signed
    /// state, and starts the submission lifecycle.
    pub fn close(
        &self,
        channel_id: ChannelId,
        trader_signature: [u8; 65],
        lp_signature: [u8; 65],
        now_ms: u64,
    ) -> Result<SettlementRequest, SettlementError> {
        let channel = self.machine.close(channel_id)?;
        let final_state = ChannelStateSnapshot::from_channel(&channel, self.domain.chain_id, now_ms);
        let request = SettlementRequest {
            channel_id,
            final_state,
            trader_signature,
            lp_signature,
            status: SubmissionStatus::Pending,
            attempts: 0,
            staged_dispute: None,
        };
        self.settlements.insert(channel_id, (request.clone(), RetryState::new()));
        Ok(request)
    }

    /// Submits the staged settlement and returns the resulting status.
    /// Retries on a failed receipt with exponential backoff up to
    /// `max_submission_attempts`; exhaustion marks the channel `disputed`
    /// and raises the returned flag for the caller to alert on.
    pub async fn submit_pending_settlement(
        &self,
        channel_id: ChannelId,
    ) -> Result<SubmissionStatus, SettlementError> {
        let mut delay = std::time::Duration::from_millis(self.config.submission_retry_base_ms);
        loop {
            let request = {
                let entry = self
                    .settlements
                    .get(&channel_id)
                    .ok_or(SettlementError::NoSettlementInFlight(channel_id))?;
                if matches!(entry.0.status, SubmissionStatus::Confirmed | SubmissionStatus::Failed) {
                    return Err(SettlementError::AlreadySubmitted(channel_id, entry.0.status));
                }
                entry.0.clone()
            };

            let receipt = self.submitter.submit_settlement(&request).await;
            let event = if receipt.confirmed { ReceiptEvent::Confirmed } else { ReceiptEvent::Failed };

            let mut entry = self
                .settlements
                .get_mut(&channel_id)
                .ok_or(SettlementError::NoSettlementInFlight(channel_id))?;
            entry.1 = entry.1.advance(event, self.config.max_submission_attempts);
            entry.0.attempts += 1;

            if entry.1.is_confirmed() {
                entry.0.status = SubmissionStatus::Confirmed;
                drop(entry);
                self.machine.mark_closed(channel_id)?;
                return Ok(SubmissionStatus::Confirmed);
            }

            if entry.1.is_exhausted() {
                entry.0.status = SubmissionStatus::Failed;
                let attempts = entry.0.attempts;
                drop(entry);
                self.machine.mark_disputed(channel_id)?;
                warn!(%channel_id, attempts, "settlement submission exhausted, channel disputed");
                return Err(SettlementError::RetriesExhausted(channel_id, attempts));
            }

            entry.0.status = SubmissionStatus::Submitted;
            drop(entry);
            sleep(delay).await;
            delay *= 2;
        }
    }

    /// Stages a newer dual-signed state submitted after a close is already
    /// in flight but before confirmation (§4.3 dispute handling). Resolution
    /// between the two candidates is an explicit follow-up call, never
    /// automatic.
    pub fn stage_dispute(
        &self,
        channel_id: ChannelId,
        disputed_state: SettlementRequest,
    ) -> Result<(), SettlementError> {
        let mut entry = self
            .settlements
            .get_mut(&channel_id)
            .ok_or(SettlementError::NoSettlementInFlight(channel_id))?;
        entry.0.staged_dispute = Some(Box::new(disputed_state));
        Ok(())
    }

    /// Explicit operator/API resolution of a staged dispute: replaces the
    /// in-flight request with the staged one and restarts the submission
    /// state machine.
    pub fn resolve_dispute_with_staged(&self, channel_id: ChannelId) -> Result<(), SettlementError> {
        let mut entry = self
            .settlements
            .get_mut(&channel_id)
            .ok_or(SettlementError::NoSettlementInFlight(channel_id))?;
        let staged = entry.0.staged_dispute.take().ok_or(SettlementError::NoCheckpointStaged(channel_id))?;
        entry.0 = *staged;
        entry.1 = RetryState::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NoopSubmitter;
    use k256::ecdsa::SigningKey;
    use rfq_state::StateConfig;
    use rfq_store::InMemoryChannelStore;
    use rfq_types::{Amount, OpenChannelParams};

    fn sign(key: &SigningKey, hash: &[u8; 32]) -> [u8; 65] {
        let (sig, recid) = key.sign_prehash_recoverable(hash).expect("signing failed");
        let sig_bytes = sig.to_bytes();
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&sig_bytes[..32]);
        out[32..64].copy_from_slice(&sig_bytes[32..]);
        out[64] = recid.to_byte() + 27;
        out
    }

    /// A key plus the address `recover_signer` derives from it, so tests
    /// never need direct pubkey-to-address conversion.
    fn keypair() -> (SigningKey, [u8; 20]) {
        let key = SigningKey::random(&mut rand::thread_rng());
        let probe = [7u8; 32];
        let sig = sign(&key, &probe);
        let addr = recover_signer(&probe, &sig).expect("recovery of probe signature");
        (key, addr)
    }

    fn driver() -> (SettlementDriver<InMemoryChannelStore>, ChannelId, SigningKey, SigningKey) {
        let store = Arc::new(InMemoryChannelStore::new());
        let config = StateConfig::default();
        let domain = DomainSeparator::new("PhotonX", "1", config.chain_id);
        let machine = Arc::new(ChannelStateMachine::new(store, config));
        let (trader_key, trader_addr) = keypair();
        let (lp_key, lp_addr) = keypair();
        let (channel_id, _) = machine
            .open(
                OpenChannelParams {
                    trader: trader_addr,
                    lp: lp_addr,
                    deposits: vec![([1u8; 20], Amount::from(1_000u64))],
                    timeout_ms: 60_000,
                },
                1,
            )
            .unwrap();
        let driver = SettlementDriver::new(
            machine,
            Arc::new(NoopSubmitter::new()),
            SettlementConfig::default(),
            domain,
        );
        (driver, channel_id, trader_key, lp_key)
    }

    #[test]
    fn checkpoint_round_trip_stages_and_commits() {
        let (driver, channel_id, trader_key, lp_key) = driver();
        let snapshot = ChannelStateSnapshot::from_channel(
            &driver.machine.get_state(channel_id).unwrap(),
            driver.domain.chain_id,
            2,
        );
        let hash = hash_channel_state(&snapshot, &driver.domain);
        let trader_sig = sign(&trader_key, &hash);
        let lp_sig = sign(&lp_key, &hash);

        let checkpoint = driver.request_checkpoint(channel_id, trader_sig, lp_sig, 2).unwrap();
        assert_eq!(checkpoint.channel_id, channel_id);
        assert_eq!(driver.machine.get_state(channel_id).unwrap().status, ChannelStatus::Active);
    }

    #[tokio::test]
    async fn close_and_submit_confirms_via_noop_submitter() {
        let (driver, channel_id, _trader_key, _lp_key) = driver();
        driver.close(channel_id, [0u8; 65], [0u8; 65], 5).unwrap();
        let status = driver.submit_pending_settlement(channel_id).await.unwrap();
        assert_eq!(status, SubmissionStatus::Confirmed);
    }
}
