//! # Message Pipeline
//!
//! Owns the six-stage validation chain from §4.2. Stage 1 (shape) runs
//! before a channel lock is ever taken; stages 2-6 run inside
//! [`rfq_state::ChannelStateMachine::apply_message`], serialized per
//! channel under the store's distributed lock, with a bounded number of
//! validations in flight across the whole pipeline for back-pressure.

use crate::domain::entities::PipelineConfig;
use crate::domain::errors::PipelineError;
use dashmap::DashMap;
use rfq_bus::{AlertSeverity, CoordinatorEvent, EventPublisher, SharedBus};
use rfq_state::{ChannelStateMachine, StateError};
use rfq_store::ChannelStore;
use rfq_types::{Amount, Channel, ChannelId, Message, Side};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

const LOCK_RETRY_ATTEMPTS: u32 = 5;
const LOCK_RETRY_BASE_DELAY: Duration = Duration::from_millis(20);
const STORE_RETRY_ATTEMPTS: u32 = 3;
const STORE_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

pub struct MessagePipeline<S: ChannelStore> {
    machine: Arc<ChannelStateMachine<S>>,
    store: Arc<S>,
    bus: SharedBus,
    config: PipelineConfig,
    inflight: Arc<Semaphore>,
    queue_depth: DashMap<ChannelId, Arc<AtomicUsize>>,
}

impl<S: ChannelStore + 'static> MessagePipeline<S> {
    pub fn new(
        machine: Arc<ChannelStateMachine<S>>,
        store: Arc<S>,
        bus: SharedBus,
        config: PipelineConfig,
    ) -> Self {
        let inflight = Arc::new(Semaphore::new(config.max_in_flight));
        Self { machine, store, bus, config, inflight, queue_depth: DashMap::new() }
    }

    /// Runs a message through all six stages and, on success, broadcasts
    /// the resulting `(channel_id, new_state, message)` on the bus.
    pub async fn submit(&self, message: Message, now_ms: u64) -> Result<Channel, PipelineError> {
        shape_check(&message, &self.config)?;

        let channel_id = message.channel_id();
        let _depth_guard = self.reserve_queue_slot(channel_id)?;

        let _permit = self.inflight.acquire().await.expect("semaphore not closed");

        let owner_token = format!("pipeline-{:?}-{}", std::thread::current().id(), now_ms);
        self.acquire_lock_with_retry(channel_id, &owner_token).await?;

        let result = self.apply_with_store_retry(message.clone(), now_ms, channel_id).await;

        let _ = self.store.release_lock(channel_id, &owner_token);

        let channel = result?;

        self.bus
            .publish(CoordinatorEvent::ChannelUpdated {
                channel_id,
                new_state: Box::new(channel.clone()),
                message: Box::new(message),
            })
            .await;

        Ok(channel)
    }

    fn reserve_queue_slot(&self, channel_id: ChannelId) -> Result<QueueSlotGuard, PipelineError> {
        let counter = self
            .queue_depth
            .entry(channel_id)
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
            .clone();
        let depth = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if depth > self.config.max_queue_depth {
            counter.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::Overloaded(channel_id));
        }
        Ok(QueueSlotGuard { counter })
    }

    async fn acquire_lock_with_retry(
        &self,
        channel_id: ChannelId,
        owner_token: &str,
    ) -> Result<(), PipelineError> {
        let mut delay = LOCK_RETRY_BASE_DELAY;
        for attempt in 0..LOCK_RETRY_ATTEMPTS {
            match self.store.acquire_lock(channel_id, owner_token, self.config.lock_ttl) {
                Ok(rfq_store::LockOutcome::Acquired) => return Ok(()),
                Ok(rfq_store::LockOutcome::HeldByOther) => {
                    if attempt + 1 == LOCK_RETRY_ATTEMPTS {
                        return Err(PipelineError::LockTimeout(channel_id));
                    }
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(PipelineError::State(StateError::Store(e))),
            }
        }
        Err(PipelineError::LockTimeout(channel_id))
    }

    /// Applies the message, retrying on a store error with backoff before
    /// escalating: the channel is marked `disputed` and an operator alert
    /// is raised (§4.1 failure semantics).
    async fn apply_with_store_retry(
        &self,
        message: Message,
        now_ms: u64,
        channel_id: ChannelId,
    ) -> Result<Channel, PipelineError> {
        let mut delay = STORE_RETRY_BASE_DELAY;
        let mut last_err = None;
        for attempt in 0..STORE_RETRY_ATTEMPTS {
            match self.machine.apply_message(message.clone(), now_ms) {
                Ok(channel) => return Ok(channel),
                Err(StateError::Store(e)) => {
                    last_err = Some(StateError::Store(e));
                    if attempt + 1 < STORE_RETRY_ATTEMPTS {
                        sleep(delay).await;
                        delay *= 2;
                    }
                }
                Err(other) => return Err(PipelineError::State(other)),
            }
        }
        let err = last_err.expect("loop runs at least once");
        if let Ok(()) = self.machine.mark_disputed(channel_id).map(|_| ()) {
            self.bus
                .publish(CoordinatorEvent::OperatorAlert {
                    channel_id,
                    reason: format!("store retries exhausted: {err}"),
                    severity: AlertSeverity::Critical,
                })
                .await;
        }
        Err(PipelineError::State(err))
    }
}

struct QueueSlotGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for QueueSlotGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stage 1: shape. Required fields present, numerical ranges sane.
fn shape_check(message: &Message, config: &PipelineConfig) -> Result<(), PipelineError> {
    match message {
        Message::QuoteRequest { quantity, max_slippage_bps, .. } => {
            require(!quantity.is_zero(), "quantity must be nonzero")?;
            require(
                *max_slippage_bps <= config.max_slippage_bps,
                "max_slippage_bps exceeds configured ceiling",
            )?;
        }
        Message::Quote { quote_id, price, quantity, lp_fee_bps, expiry_timestamp, .. } => {
            require(!quote_id.is_empty(), "quote_id must not be empty")?;
            require(!price.is_zero(), "price must be nonzero")?;
            require(!quantity.is_zero(), "quantity must be nonzero")?;
            require(*lp_fee_bps <= config.max_fee_bps, "lp_fee_bps exceeds configured ceiling")?;
            require(*expiry_timestamp > 0, "expiry_timestamp must be set")?;
        }
        Message::Fill { quote_id, fill_id, quantity, price, .. } => {
            require(!quote_id.is_empty(), "quote_id must not be empty")?;
            require(!fill_id.is_empty(), "fill_id must not be empty")?;
            require(!quantity.is_zero(), "quantity must be nonzero")?;
            require(!price.is_zero(), "price must be nonzero")?;
        }
        Message::Cancel { quote_id, .. } => {
            require(!quote_id.is_empty(), "quote_id must not be empty")?;
        }
        Message::Replace { original_quote_id, new_quote_request, .. } => {
            require(!original_quote_id.is_empty(), "original_quote_id must not be empty")?;
            require(
                matches!(new_quote_request.as_ref(), Message::QuoteRequest { .. }),
                "new_quote_request must be a quote_request",
            )?;
            shape_check(new_quote_request, config)?;
        }
        Message::Heartbeat { .. } => {}
    }
    Ok(())
}

fn require(condition: bool, message: &str) -> Result<(), PipelineError> {
    if condition {
        Ok(())
    } else {
        Err(PipelineError::Malformed(message.to_string()))
    }
}
