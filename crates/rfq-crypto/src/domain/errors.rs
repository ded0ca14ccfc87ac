//! # Signature Errors
//!
//! Error types for ECDSA recovery and verification.

use thiserror::Error;

/// Errors that can occur during signature verification (§7 `bad_signature`).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature format is invalid (wrong length, invalid encoding).
    #[error("invalid signature format")]
    InvalidFormat,

    /// Signature verification failed (signature doesn't match message/signer).
    #[error("signature verification failed")]
    VerificationFailed,

    /// Signature has a high S value (EIP-2 malleability protection).
    #[error("malleable signature (high S value)")]
    MalleableSignature,

    /// Invalid recovery ID (v must be 0, 1, 27, or 28).
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Failed to recover a public key from the signature.
    #[error("failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match the claimed participant.
    #[error("signer mismatch: expected {expected:?}, got {actual:?}")]
    SignerMismatch {
        expected: [u8; 20],
        actual: [u8; 20],
    },
}
