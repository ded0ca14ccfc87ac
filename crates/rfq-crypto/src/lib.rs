//! # Crypto & Codec
//!
//! Domain-separated typed-data hashing, secp256k1 ECDSA recovery and
//! verification, and canonical encoding of channel states and wire
//! messages (§4.5).
//!
//! ## Architecture
//!
//! Pure domain logic, no I/O: the pipeline and state machine call these
//! functions directly rather than through a port/adapter boundary.
//!
//! ## Security notes
//!
//! - Malleability prevention (EIP-2): signatures with a high S value are
//!   rejected.
//! - Scalar/coordinate validation on R and S per SEC1 before recovery.
//! - All scalar comparisons run in constant time (`subtle`).

pub mod domain;

pub use domain::ecdsa::{batch_verify_ecdsa, keccak256, recover_signer, EcdsaVerifier};
pub use domain::eip712::{hash_channel_state, hash_message, DomainSeparator};
pub use domain::entities::{
    BatchVerificationResult, EcdsaSignature, VerificationRequest, VerificationResult,
};
pub use domain::errors::SignatureError;
