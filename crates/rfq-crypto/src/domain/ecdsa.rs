//! # ECDSA Verification (secp256k1)
//!
//! Pure domain logic for recovering and verifying secp256k1 ECDSA
//! signatures over channel state and message hashes.
//!
//! ## Security notes
//!
//! - **Malleability prevention (EIP-2)**: S must be strictly less than
//!   `SECP256K1_HALF_ORDER`.
//! - **Scalar range validation**: R and S must be in `[1, n-1]`.
//! - **R point validation**: R must be a valid x-coordinate on the curve.
//! - **Constant-time comparisons** via the `subtle` crate.

use super::entities::{
    BatchVerificationResult, EcdsaSignature, VerificationRequest, VerificationResult,
};
use super::errors::SignatureError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::FromEncodedPoint;
use k256::{AffinePoint, EncodedPoint};
use rfq_types::{Address, Hash};
use sha3::{Digest, Keccak256};
use subtle::{Choice, ConstantTimeEq};

/// secp256k1 curve order n
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Half of the secp256k1 curve order (for malleability check).
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// ECDSA signature verifier.
#[derive(Debug, Clone, Default)]
pub struct EcdsaVerifier;

impl EcdsaVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify an ECDSA signature and recover the signer address.
    pub fn verify_ecdsa(
        &self,
        message_hash: &Hash,
        signature: &EcdsaSignature,
    ) -> VerificationResult {
        verify_ecdsa(message_hash, signature)
    }

    /// Verify an ECDSA signature and check that the recovered signer matches `expected`.
    pub fn verify_ecdsa_signer(
        &self,
        message_hash: &Hash,
        signature: &EcdsaSignature,
        expected: Address,
    ) -> VerificationResult {
        verify_ecdsa_signer(message_hash, signature, expected)
    }

    /// Recover the signer's address from a signature.
    pub fn recover_address(
        &self,
        message_hash: &Hash,
        signature: &EcdsaSignature,
    ) -> Result<Address, SignatureError> {
        recover_address(message_hash, signature)
    }

    /// Batch verify multiple signatures in parallel.
    pub fn batch_verify_ecdsa(&self, requests: &[VerificationRequest]) -> BatchVerificationResult {
        batch_verify_ecdsa(requests)
    }
}

/// Verify an ECDSA signature and recover the signer address.
///
/// Security validations performed:
/// 1. R is in valid range `[1, n-1]`.
/// 2. R is a valid x-coordinate on the secp256k1 curve.
/// 3. R has sufficient entropy (not obviously synthetic).
/// 4. S is in valid range `[1, n-1]`.
/// 5. S is in the lower half per EIP-2 malleability protection.
/// 6. Recovery id (v) is valid (0, 1, 27, or 28).
/// 7. Public key recovery succeeds.
pub fn verify_ecdsa(message_hash: &Hash, signature: &EcdsaSignature) -> VerificationResult {
    if !is_valid_scalar(&signature.r) {
        return VerificationResult::invalid(SignatureError::InvalidFormat);
    }

    if !is_valid_r_coordinate(&signature.r) {
        return VerificationResult::invalid(SignatureError::InvalidFormat);
    }

    if !has_sufficient_entropy(&signature.r) {
        return VerificationResult::invalid(SignatureError::InvalidFormat);
    }

    if !is_valid_scalar(&signature.s) {
        return VerificationResult::invalid(SignatureError::InvalidFormat);
    }

    if !is_low_s(&signature.s) {
        return VerificationResult::invalid(SignatureError::MalleableSignature);
    }

    match recover_address(message_hash, signature) {
        Ok(address) => VerificationResult::valid(address),
        Err(e) => VerificationResult::invalid(e),
    }
}

/// Verify an ECDSA signature and check that the recovered signer matches `expected`.
pub fn verify_ecdsa_signer(
    message_hash: &Hash,
    signature: &EcdsaSignature,
    expected: Address,
) -> VerificationResult {
    let result = verify_ecdsa(message_hash, signature);

    if !result.valid {
        return result;
    }

    if let Some(recovered) = result.recovered_address {
        if recovered != expected {
            return VerificationResult::invalid(SignatureError::SignerMismatch {
                expected,
                actual: recovered,
            });
        }
    }

    result
}

/// Recover the signer's address from a signature over a prehashed message.
pub fn recover_address(
    message_hash: &Hash,
    signature: &EcdsaSignature,
) -> Result<Address, SignatureError> {
    use zeroize::Zeroize;

    let recovery_id = parse_recovery_id(signature.v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);

    let sig = match Signature::from_slice(&sig_bytes) {
        Ok(s) => {
            sig_bytes.zeroize();
            s
        }
        Err(_) => {
            sig_bytes.zeroize();
            return Err(SignatureError::InvalidFormat);
        }
    };

    let recovered_key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_from_pubkey(&recovered_key))
}

/// Recover a signer address from a raw 65-byte `r||s||v` signature.
pub fn recover_signer(hash: &Hash, sig65: &[u8; 65]) -> Result<Address, SignatureError> {
    let signature = EcdsaSignature::from_bytes(sig65);
    recover_address(hash, &signature)
}

/// Batch verify multiple ECDSA signatures in parallel.
pub fn batch_verify_ecdsa(requests: &[VerificationRequest]) -> BatchVerificationResult {
    use rayon::prelude::*;

    let results: Vec<VerificationResult> = requests.par_iter().map(verify_single_request).collect();

    BatchVerificationResult::from_results(results)
}

fn verify_single_request(req: &VerificationRequest) -> VerificationResult {
    let result = verify_ecdsa(&req.message_hash, &req.signature);

    if !result.valid {
        return result;
    }

    match (req.expected_signer, result.recovered_address) {
        (Some(expected), Some(recovered)) if recovered != expected => {
            VerificationResult::invalid(SignatureError::SignerMismatch {
                expected,
                actual: recovered,
            })
        }
        _ => result,
    }
}

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Derive an address from a recovered public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    let pubkey_slice = pubkey_bytes.as_bytes();

    // Keccak256 of the uncompressed key, dropping the 0x04 prefix.
    let hash = keccak256(&pubkey_slice[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Check if S is in the lower half of the curve order (EIP-2).
///
/// Constant-time: runs in fixed time regardless of input to avoid leaking
/// signature data through timing.
fn is_low_s(s: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let s_byte = s[i];
        let h_byte = SECP256K1_HALF_ORDER[i];

        let not_decided = !(less | greater);
        let byte_less = Choice::from((s_byte < h_byte) as u8);
        let byte_greater = Choice::from((s_byte > h_byte) as u8);

        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }

    less.into()
}

/// Check if a scalar is in valid range `[1, n-1]`. Constant-time.
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }

    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let s_byte = scalar[i];
        let n_byte = SECP256K1_ORDER[i];

        let not_decided = !(less | greater);
        let byte_less = Choice::from((s_byte < n_byte) as u8);
        let byte_greater = Choice::from((s_byte > n_byte) as u8);

        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }

    let not_zero = !is_zero;
    let valid = not_zero & less;
    valid.into()
}

/// Validate that R is a valid x-coordinate on the secp256k1 curve.
///
/// Not every 32-byte value is a valid x-coordinate; roughly half of all
/// field elements have no corresponding curve point. Rejecting the rest
/// keeps fabricated signatures with arbitrary R values out.
fn is_valid_r_coordinate(r: &[u8; 32]) -> bool {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(r);

    let encoded = match EncodedPoint::from_bytes(compressed) {
        Ok(e) => e,
        Err(_) => return false,
    };

    let point = AffinePoint::from_encoded_point(&encoded);
    point.is_some().into()
}

/// Heuristic entropy check: reject obviously synthetic R/S values (constant
/// bytes, tiny magnitudes, alternating patterns, low byte diversity).
fn has_sufficient_entropy(value: &[u8; 32]) -> bool {
    let first = value[0];
    if value.iter().all(|&b| b == first) {
        return false;
    }

    let leading_zeros = value.iter().take_while(|&&b| b == 0).count();
    if leading_zeros >= 28 {
        return false;
    }

    if value.len() >= 4 {
        let is_alternating = value
            .chunks(2)
            .skip(1)
            .all(|chunk| chunk.len() == 2 && chunk[0] == value[0] && chunk[1] == value[1]);
        if is_alternating && value[0] != value[1] {
            return false;
        }
    }

    let mut byte_counts = [0u32; 256];
    for &b in value {
        byte_counts[b as usize] += 1;
    }
    let unique_bytes = byte_counts.iter().filter(|&&c| c > 0).count();
    let max_count = byte_counts.iter().max().copied().unwrap_or(0);

    if max_count >= 28 {
        return false;
    }

    if unique_bytes <= 3 {
        return false;
    }

    true
}

/// Parse a recovery id from `v`. Valid values: 0, 1, 27, 28.
fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };

    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

/// Invert S for malleability testing: s' = n - s.
pub fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i32 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_ORDER[i] as i32) - (s[i] as i32) - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }

    result
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use k256::ecdsa::SigningKey;

    pub fn generate_keypair() -> (SigningKey, VerifyingKey) {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = *signing_key.verifying_key();
        (signing_key, verifying_key)
    }

    pub fn sign(message_hash: &Hash, private_key: &SigningKey) -> EcdsaSignature {
        let (sig, recid) = private_key
            .sign_prehash_recoverable(message_hash)
            .expect("signing failed");

        let sig_bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..]);

        let s_normalized = if !is_low_s(&s) { invert_s(&s) } else { s };

        let v = if s_normalized != s {
            if recid.to_byte() == 0 {
                28
            } else {
                27
            }
        } else {
            recid.to_byte() + 27
        };

        EcdsaSignature {
            r,
            s: s_normalized,
            v,
        }
    }

    pub fn create_valid_verification_request() -> VerificationRequest {
        let (private_key, public_key) = generate_keypair();
        let message_hash = keccak256(b"test message");
        let signature = sign(&message_hash, &private_key);
        let expected_signer = address_from_pubkey(&public_key);

        VerificationRequest {
            message_hash,
            signature,
            expected_signer: Some(expected_signer),
        }
    }

    pub fn create_invalid_verification_request() -> VerificationRequest {
        let message_hash = keccak256(b"test message");
        let invalid_signature = EcdsaSignature {
            r: [0xFF; 32],
            s: [0xFF; 32],
            v: 27,
        };

        VerificationRequest {
            message_hash,
            signature: invalid_signature,
            expected_signer: None,
        }
    }
}
