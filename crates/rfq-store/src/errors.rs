//! # Store Errors

use rfq_types::{ChannelId, ErrorKind};
use thiserror::Error;

/// Failures surfaced by a `ChannelStore` implementation (§7 store category).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("channel {0} not found")]
    NotFound(ChannelId),

    #[error("duplicate message at channel {channel_id} nonce {nonce}")]
    DuplicateMessage { channel_id: ChannelId, nonce: u64 },

    #[error("lock on channel {0} held by another owner")]
    LockHeld(ChannelId),

    #[error("lock on channel {channel_id} not held by {owner_token}")]
    LockNotOwned {
        channel_id: ChannelId,
        owner_token: String,
    },

    #[error("transactional write aborted: {0}")]
    TransactionAborted(String),
}

impl From<&StoreError> for ErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::DuplicateMessage { .. } => ErrorKind::StaleNonce,
            StoreError::LockHeld(_) => ErrorKind::LockUnavailable,
            StoreError::LockNotOwned { .. } => ErrorKind::LockUnavailable,
            StoreError::TransactionAborted(_) => ErrorKind::InvariantViolation,
        }
    }
}
