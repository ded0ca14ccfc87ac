//! # State Machine Errors
//!
//! All variants are recoverable rejections (§4.1 failure semantics): the
//! channel record is left unchanged and the error is surfaced to the caller.

use rfq_store::StoreError;
use rfq_types::{ChannelId, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("channel {0} not found")]
    NotFound(ChannelId),

    /// §4.1 `open`: trader and LP must be distinct.
    #[error("trader and lp must be distinct participants")]
    InvalidParticipant,

    /// §4.1 `open`: every deposit must be nonzero.
    #[error("deposit for token must be nonzero")]
    InvalidDeposit,

    /// §4.1 `open`: requested timeout below the configured floor.
    #[error("timeout {requested}ms below floor {floor}ms")]
    TimeoutTooShort { requested: u64, floor: u64 },

    /// §4.1: only `active` accepts trading messages (`checkpointing` also
    /// accepts heartbeats).
    #[error("channel {channel_id} is in status {status:?}, which does not accept this message")]
    WrongStatus {
        channel_id: ChannelId,
        status: rfq_types::ChannelStatus,
    },

    /// §4.1 nonce monotonicity: `new.nonce` must exceed the current nonce.
    #[error("stale nonce for channel {channel_id}: current {current}, got {got}")]
    StaleNonce {
        channel_id: ChannelId,
        current: u64,
        got: u64,
    },

    /// §4.1 timestamp monotonicity / skew window.
    #[error("stale timestamp for channel {channel_id}: current {current}, got {got}")]
    StaleTimestamp {
        channel_id: ChannelId,
        current: u64,
        got: u64,
    },

    #[error("signature does not recover to an authorized signer for channel {0}")]
    BadSignature(ChannelId),

    #[error("signer is not a participant of channel {0}")]
    NotParticipant(ChannelId),

    #[error("quote {0} not found")]
    QuoteNotFound(String),

    #[error("quote {0} has expired")]
    QuoteExpired(String),

    #[error("quote {0} has already been filled")]
    AlreadyFilled(String),

    /// §4.1 balance update on fill: the debit would underflow.
    #[error("insufficient balance on channel {channel_id} for token")]
    InsufficientBalance { channel_id: ChannelId },

    /// §4.1: channel id or participant set mismatch between message and record.
    #[error("invariant violation on channel {0}")]
    InvariantViolation(ChannelId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<&StateError> for ErrorKind {
    fn from(err: &StateError) -> Self {
        match err {
            StateError::NotFound(_) => ErrorKind::NotFound,
            StateError::InvalidParticipant => ErrorKind::InvalidParticipant,
            StateError::InvalidDeposit => ErrorKind::InvalidDeposit,
            StateError::TimeoutTooShort { .. } => ErrorKind::TimeoutTooShort,
            StateError::WrongStatus { .. } => ErrorKind::WrongStatus,
            StateError::StaleNonce { .. } => ErrorKind::StaleNonce,
            StateError::StaleTimestamp { .. } => ErrorKind::StaleTimestamp,
            StateError::BadSignature(_) => ErrorKind::BadSignature,
            StateError::NotParticipant(_) => ErrorKind::NotParticipant,
            StateError::QuoteNotFound(_) => ErrorKind::QuoteNotFound,
            StateError::QuoteExpired(_) => ErrorKind::QuoteExpired,
            StateError::AlreadyFilled(_) => ErrorKind::AlreadyFilled,
            StateError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            StateError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            StateError::Store(e) => ErrorKind::from(e),
        }
    }
}
