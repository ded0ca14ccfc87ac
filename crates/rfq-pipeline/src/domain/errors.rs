//! # Pipeline Errors
//!
//! Stage 1 (shape) is checked here before a message ever reaches the state
//! machine; stages 2-6 (lookup, participant, signature, ordering, semantic)
//! are [`rfq_state::StateError`] variants reached under the per-channel
//! lock, so this enum just wraps them rather than re-deriving each one.

use rfq_state::StateError;
use rfq_types::{ChannelId, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("channel {0} has too many messages queued")]
    Overloaded(ChannelId),

    #[error("timed out waiting for the lock on channel {0}")]
    LockTimeout(ChannelId),

    #[error(transparent)]
    State(#[from] StateError),
}

impl From<&PipelineError> for ErrorKind {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::Malformed(_) => ErrorKind::Shape,
            PipelineError::Overloaded(_) => ErrorKind::Overloaded,
            PipelineError::LockTimeout(_) => ErrorKind::LockUnavailable,
            PipelineError::State(e) => ErrorKind::from(e),
        }
    }
}
