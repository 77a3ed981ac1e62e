//! # Key Management
//!
//! Ed25519 keypairs and the account identifiers derived from them.
//!
//! An [`AccountId`] is the 32-byte Ed25519 public key of a caller. The ledger
//! itself treats it as an opaque fixed-width identifier: it compares, stores
//! and emits account ids, it never verifies anything with them. Verification
//! happens at the edge, when the node checks a signed call.
//!
//! ## Encoding
//!
//! - Human-readable serializers (JSON) see 64 lowercase hex characters.
//! - Binary serializers (bincode, the storage format) see the raw 32 bytes.
//!
//! Key bytes are never logged. `Debug` on [`ArcaKeypair`] prints the public
//! half only.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ACCOUNT_ID_LENGTH, SIGNATURE_LENGTH, SIGNING_KEY_LENGTH};

/// Errors that can occur while parsing or reconstructing key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected 32 bytes of hex")]
    InvalidSecretKey,

    #[error("invalid account id: expected 32 bytes of hex")]
    InvalidAccountId,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignature,
}

// ---------------------------------------------------------------------------
// ArcaKeypair
// ---------------------------------------------------------------------------

/// An Ed25519 keypair belonging to a ledger caller.
///
/// `ArcaKeypair` intentionally does NOT implement `Serialize`. Exporting a
/// secret key should be a deliberate call to [`secret_key_hex`](Self::secret_key_hex).
pub struct ArcaKeypair {
    signing_key: SigningKey,
}

impl ArcaKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Tests love this.
    pub fn from_seed(seed: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key, as written by
    /// `arca-node init`.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SIGNING_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The account id of this keypair, i.e. its public key.
    pub fn account_id(&self) -> AccountId {
        AccountId::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> ArcaSignature {
        let sig = self.signing_key.sign(message);
        ArcaSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Hex-encoded secret key. Handle with care; this is the whole identity.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }
}

impl Clone for ArcaKeypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for ArcaKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArcaKeypair(pub={})", self.account_id())
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A ledger account: 32 opaque bytes, in practice an Ed25519 public key.
///
/// Ordered so it can live in a `BTreeSet`, which keeps member sets (and
/// therefore their serialized form) deterministic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId {
    bytes: [u8; ACCOUNT_ID_LENGTH],
}

impl AccountId {
    /// Wrap raw bytes. No curve check; the ledger does not care whether an
    /// account id is a valid point, only the signature verifier does.
    pub const fn from_bytes(bytes: [u8; ACCOUNT_ID_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parse from a byte slice of exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; ACCOUNT_ID_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidAccountId)?;
        Ok(Self { bytes })
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidAccountId)?;
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..16])
    }
}

impl FromStr for AccountId {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.bytes.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <[u8; ACCOUNT_ID_LENGTH]>::deserialize(deserializer)?;
            Ok(Self { bytes })
        }
    }
}

// ---------------------------------------------------------------------------
// ArcaSignature
// ---------------------------------------------------------------------------

/// An Ed25519 signature. Stored as a `Vec<u8>`; anything that is not
/// exactly 64 bytes simply fails verification.
#[derive(Clone, PartialEq, Eq)]
pub struct ArcaSignature {
    bytes: Vec<u8>,
}

impl ArcaSignature {
    /// `None` unless the signature is exactly 64 bytes.
    pub fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidSignature)?;
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for ArcaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ArcaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 2 * SIGNATURE_LENGTH {
            write!(f, "ArcaSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "ArcaSignature({})", hex_str)
        }
    }
}

impl Serialize for ArcaSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.bytes.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ArcaSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            Ok(Self { bytes })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signatures::verify_checked;

    #[test]
    fn keypair_sign_verify_roundtrip() {
        let kp = ArcaKeypair::generate();
        let msg = b"create vault";
        let sig = kp.sign(msg);
        assert!(verify_checked(&kp.account_id(), msg, &sig).is_ok());
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = ArcaKeypair::from_seed(&[3u8; 32]);
        assert_eq!(kp.sign(b"burn vault 0"), kp.sign(b"burn vault 0"));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        assert_eq!(
            ArcaKeypair::from_seed(&seed).account_id(),
            ArcaKeypair::from_seed(&seed).account_id()
        );
    }

    #[test]
    fn secret_key_hex_roundtrip() {
        let kp = ArcaKeypair::generate();
        let restored = ArcaKeypair::from_hex(&kp.secret_key_hex()).unwrap();
        assert_eq!(kp.account_id(), restored.account_id());
    }

    #[test]
    fn secret_key_hex_tolerates_trailing_newline() {
        let kp = ArcaKeypair::from_seed(&[7u8; 32]);
        let with_newline = format!("{}\n", kp.secret_key_hex());
        let restored = ArcaKeypair::from_hex(&with_newline).unwrap();
        assert_eq!(kp.account_id(), restored.account_id());
    }

    #[test]
    fn invalid_secret_hex_rejected() {
        assert_eq!(
            ArcaKeypair::from_hex("deadbeef").unwrap_err(),
            KeyError::InvalidSecretKey
        );
        assert!(ArcaKeypair::from_hex("not-hex-at-all").is_err());
    }

    #[test]
    fn account_id_hex_roundtrip() {
        let id = ArcaKeypair::generate().account_id();
        let parsed: AccountId = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.to_hex().len(), 64);
    }

    #[test]
    fn account_id_rejects_wrong_length() {
        assert_eq!(
            AccountId::from_hex("abcd").unwrap_err(),
            KeyError::InvalidAccountId
        );
        assert!(AccountId::try_from_slice(&[0u8; 16]).is_err());
    }

    #[test]
    fn account_id_json_is_hex_string() {
        let id = AccountId::from_bytes([0xAB; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn account_id_bincode_is_raw_bytes() {
        let id = AccountId::from_bytes([0x01; 32]);
        let bytes = bincode::serialize(&id).unwrap();
        assert_eq!(bytes.len(), 32);
        let back: AccountId = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn signature_hex_roundtrip() {
        let kp = ArcaKeypair::generate();
        let sig = kp.sign(b"test");
        let recovered = ArcaSignature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, recovered);
        assert!(ArcaSignature::from_hex("abcd").is_err());
    }

    #[test]
    fn truncated_signature_fails_verification() {
        let kp = ArcaKeypair::generate();
        let sig = kp.sign(b"msg");
        let truncated = ArcaSignature {
            bytes: sig.bytes[..32].to_vec(),
        };
        assert!(verify_checked(&kp.account_id(), b"msg", &truncated).is_err());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = ArcaKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("ArcaKeypair(pub="));
        assert!(!debug_str.contains(&kp.secret_key_hex()));
    }
}
