//! # Digital Signatures
//!
//! Typed Ed25519 verification for bytes straight off the wire. Signing lives
//! on [`ArcaKeypair::sign`](super::keys::ArcaKeypair::sign).

use ed25519_dalek::VerifyingKey;
use thiserror::Error;

use super::keys::{AccountId, ArcaSignature};

/// Errors during signature verification.
///
/// Intentionally vague: a caller learns that verification failed, not why.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignatureBytes,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Verify with a typed error, distinguishing malformed inputs from a plain
/// mismatch. Uses strict verification (rejects small-order keys and
/// non-canonical signatures).
///
/// An account id that is not a valid curve point can own vaults but can
/// never sign for them: it always fails with
/// [`SignatureError::InvalidPublicKey`].
pub fn verify_checked(
    account: &AccountId,
    message: &[u8],
    signature: &ArcaSignature,
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(account.as_bytes()).map_err(|_| SignatureError::InvalidPublicKey)?;
    let signature = signature
        .to_dalek_signature()
        .ok_or(SignatureError::InvalidSignatureBytes)?;
    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}
