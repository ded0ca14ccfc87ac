//! Periodic sweep that calls [`rfq_state::ChannelStateMachine::mark_timed_out`]
//! for every open channel past its `timeout_at` (§4.1).
//!
//! The state machine and store have no ticking mechanism of their own;
//! `mark_timed_out` only fires when something calls it. This is that
//! something, run as a background task the way the teacher runs its
//! stale-assembly GC: `tokio::spawn` a loop around `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use rfq_state::{ChannelStateMachine, StateError};
use rfq_store::ChannelStore;

pub struct TimerWheel<S: ChannelStore> {
    machine: Arc<ChannelStateMachine<S>>,
    store: Arc<S>,
    sweep_interval: Duration,
}

impl<S: ChannelStore + 'static> TimerWheel<S> {
    pub fn new(machine: Arc<ChannelStateMachine<S>>, store: Arc<S>, sweep_interval: Duration) -> Self {
        Self { machine, store, sweep_interval }
    }

    /// Spawns the sweep loop and returns immediately; the task runs until
    /// the runtime shuts down.
    pub fn spawn(self) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.sweep_interval);
            loop {
                interval.tick().await;
                self.sweep();
            }
        });
    }

    /// One pass over every known channel. Not parallelized: the volume of
    /// open channels on a single coordinator instance does not warrant it,
    /// and `mark_timed_out` already serializes on the store per channel.
    pub fn sweep(&self) {
        let now_ms = current_time_ms();

        let ids = match self.store.all_channel_ids() {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "timer wheel failed to list channels");
                return;
            }
        };

        for channel_id in ids {
            match self.machine.mark_timed_out(channel_id, now_ms) {
                Ok(_) => debug!(%channel_id, "channel timed out"),
                Err(StateError::WrongStatus { .. }) => {
                    // Terminal already, or not yet past timeout_at. Expected
                    // on most sweeps; not worth logging per channel.
                }
                Err(err) => warn!(%channel_id, error = %err, "timer wheel sweep failed"),
            }
        }
    }
}

fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
