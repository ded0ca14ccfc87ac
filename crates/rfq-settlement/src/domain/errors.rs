//! Settlement driver errors.

use rfq_state::StateError;
use rfq_store::StoreError;
use rfq_types::{ChannelId, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("channel {0} has no checkpoint staged")]
    NoCheckpointStaged(ChannelId),

    #[error("channel {0} has no settlement in flight")]
    NoSettlementInFlight(ChannelId),

    #[error("submission for channel {0} is already {1:?}")]
    AlreadySubmitted(ChannelId, rfq_types::SubmissionStatus),

    #[error("submission retries exhausted for channel {0} after {1} attempts")]
    RetriesExhausted(ChannelId, u32),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<&SettlementError> for ErrorKind {
    fn from(err: &SettlementError) -> Self {
        match err {
            SettlementError::NoCheckpointStaged(_) => ErrorKind::NotFound,
            SettlementError::NoSettlementInFlight(_) => ErrorKind::NotFound,
            SettlementError::AlreadySubmitted(..) => ErrorKind::InvariantViolation,
            SettlementError::RetriesExhausted(..) => ErrorKind::Timeout,
            SettlementError::State(e) => ErrorKind::from(e),
            SettlementError::Store(e) => ErrorKind::from(e),
        }
    }
}
