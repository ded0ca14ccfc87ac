//! # Domain Entities
//!
//! Core data structures for ECDSA recovery and verification.

use rfq_types::{Address, Hash};
use serde::{Deserialize, Serialize};

/// An ECDSA signature on the secp256k1 curve, decomposed from the 65-byte
/// `r||s||v` wire encoding (§4.5).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignature {
    /// R component (32 bytes).
    pub r: [u8; 32],
    /// S component (32 bytes).
    pub s: [u8; 32],
    /// Recovery id (0, 1, 27, or 28).
    pub v: u8,
}

impl EcdsaSignature {
    /// Decomposes a 65-byte `r||s||v` wire signature.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { r, s, v: bytes[64] }
    }

    /// Re-encodes as the 65-byte wire format.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }
}

/// Request to verify an ECDSA signature.
#[derive(Clone, Debug)]
pub struct VerificationRequest {
    /// The hash of the message that was signed.
    pub message_hash: Hash,
    /// The signature to verify.
    pub signature: EcdsaSignature,
    /// Optional expected signer address; when present, verification also
    /// checks the recovered address against it.
    pub expected_signer: Option<Address>,
}

/// Result of signature verification.
#[derive(Clone, Debug)]
pub struct VerificationResult {
    /// Whether the signature is valid.
    pub valid: bool,
    /// The recovered address (if verification succeeded).
    pub recovered_address: Option<Address>,
    /// Error details (if verification failed).
    pub error: Option<super::errors::SignatureError>,
}

impl VerificationResult {
    pub fn valid(recovered_address: Address) -> Self {
        Self {
            valid: true,
            recovered_address: Some(recovered_address),
            error: None,
        }
    }

    pub fn invalid(error: super::errors::SignatureError) -> Self {
        Self {
            valid: false,
            recovered_address: None,
            error: Some(error),
        }
    }
}

/// Result of a parallel batch of verifications (§5: off-load heavy batches
/// to a bounded worker pool).
#[derive(Clone, Debug)]
pub struct BatchVerificationResult {
    pub results: Vec<VerificationResult>,
    pub all_valid: bool,
    pub valid_count: usize,
    pub invalid_count: usize,
}

impl BatchVerificationResult {
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let valid_count = results.iter().filter(|r| r.valid).count();
        let invalid_count = results.len() - valid_count;
        Self {
            all_valid: invalid_count == 0,
            valid_count,
            invalid_count,
            results,
        }
    }
}
