//! # Error Taxonomy
//!
//! The error *kinds* named in §7, shared by every component so that a
//! structured response can always be built at the transport boundary.
//! Individual crates (`rfq-state`, `rfq-pipeline`, `rfq-crypto`, ...) define
//! their own `thiserror` enums for internal propagation and convert into
//! `ErrorKind` only at their public boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A taxonomy entry from §7. Validation and semantic errors are recoverable
/// and leave state unchanged; resource errors are transient; store errors
/// are retried internally before escalating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Validation errors
    Shape,
    Range,
    StaleNonce,
    StaleTimestamp,
    BadSignature,
    NotParticipant,
    WrongStatus,
    // Semantic errors
    QuoteNotFound,
    QuoteExpired,
    AlreadyFilled,
    InsufficientBalance,
    // Resource errors
    LockUnavailable,
    Overloaded,
    Timeout,
    // Escalation / not-found
    NotFound,
    InvariantViolation,
    InvalidParticipant,
    InvalidDeposit,
    TimeoutTooShort,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Shape => "shape",
            ErrorKind::Range => "range",
            ErrorKind::StaleNonce => "stale_nonce",
            ErrorKind::StaleTimestamp => "stale_timestamp",
            ErrorKind::BadSignature => "bad_signature",
            ErrorKind::NotParticipant => "not_participant",
            ErrorKind::WrongStatus => "wrong_status",
            ErrorKind::QuoteNotFound => "quote_not_found",
            ErrorKind::QuoteExpired => "quote_expired",
            ErrorKind::AlreadyFilled => "already_filled",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::LockUnavailable => "lock_unavailable",
            ErrorKind::Overloaded => "overloaded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::InvalidParticipant => "invalid_participant",
            ErrorKind::InvalidDeposit => "invalid_deposit",
            ErrorKind::TimeoutTooShort => "timeout_too_short",
        };
        write!(f, "{s}")
    }
}

/// A structured, user-visible failure (§7 propagation policy): always
/// carries the channel id, the failing nonce when applicable, and the kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorError {
    pub kind: ErrorKind,
    pub channel_id: Option<String>,
    pub nonce: Option<u64>,
    pub message: String,
}

impl CoordinatorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            channel_id: None,
            nonce: None,
            message: message.into(),
        }
    }

    pub fn with_channel(mut self, channel_id: impl fmt::Display) -> Self {
        self.channel_id = Some(channel_id.to_string());
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl std::error::Error for CoordinatorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        let err = CoordinatorError::new(ErrorKind::StaleNonce, "nonce too low")
            .with_channel("0xCH01")
            .with_nonce(1);
        assert_eq!(err.to_string(), "nonce too low (stale_nonce)");
        assert_eq!(err.channel_id.as_deref(), Some("0xCH01"));
    }
}
