//! # Vault Calls
//!
//! The five mutating operations as data, plus the signed envelope a host
//! uses to bind a call to the key that authorized it.
//!
//! Metadata travels as a plain `String`. Validation is the ledger's job, so
//! an invalid identifier reaches it and is rejected with
//! [`VaultError::MetadataNotValid`](crate::vault_ledger::VaultError::MetadataNotValid)
//! instead of failing to decode.
//!
//! ## Signing
//!
//! The signed message is
//! `BLAKE3-derive_key(CALL_SIGNING_CONTEXT, nonce_be || bincode(call))`.
//! The caller is not part of the message; the signature itself binds it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arca_protocol::config::CALL_SIGNING_CONTEXT;
use arca_protocol::crypto::{
    domain_separated_hash_multi, verify_checked, AccountId, ArcaKeypair, ArcaSignature,
    SignatureError,
};
use arca_protocol::storage::VaultId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors building or checking a [`SignedCall`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The call could not be encoded for signing.
    #[error("call encoding failed: {0}")]
    Encoding(String),

    /// The signature does not verify against the caller.
    #[error("bad signature: {0}")]
    BadSignature(#[from] SignatureError),
}

// ---------------------------------------------------------------------------
// VaultCall
// ---------------------------------------------------------------------------

/// One mutating ledger operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultCall {
    CreateVault { metadata: String },
    UpdateMetadata { vault_id: VaultId, metadata: String },
    NominateMember { vault_id: VaultId, member: AccountId },
    RemoveMember { vault_id: VaultId, member: AccountId },
    BurnVault { vault_id: VaultId },
}

impl VaultCall {
    /// Operation name as used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            VaultCall::CreateVault { .. } => "create_vault",
            VaultCall::UpdateMetadata { .. } => "update_metadata",
            VaultCall::NominateMember { .. } => "nominate_member",
            VaultCall::RemoveMember { .. } => "remove_member",
            VaultCall::BurnVault { .. } => "burn_vault",
        }
    }

    /// The vault this call targets. `None` for creation.
    pub fn vault_id(&self) -> Option<VaultId> {
        match self {
            VaultCall::CreateVault { .. } => None,
            VaultCall::UpdateMetadata { vault_id, .. }
            | VaultCall::NominateMember { vault_id, .. }
            | VaultCall::RemoveMember { vault_id, .. }
            | VaultCall::BurnVault { vault_id } => Some(*vault_id),
        }
    }
}

// ---------------------------------------------------------------------------
// SignedCall
// ---------------------------------------------------------------------------

/// A call together with who sent it, a replay counter and a signature.
///
/// Checking that `nonce` is fresh is up to the host; this type only knows
/// whether the signature matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    pub caller: AccountId,
    pub nonce: u64,
    pub call: VaultCall,
    pub signature: ArcaSignature,
}

impl SignedCall {
    /// The 32-byte digest a caller signs for `(nonce, call)`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Encoding`] if the call cannot be bincode-encoded.
    pub fn signing_digest(nonce: u64, call: &VaultCall) -> Result<[u8; 32], CallError> {
        let encoded = bincode::serialize(call).map_err(|e| CallError::Encoding(e.to_string()))?;
        Ok(domain_separated_hash_multi(
            CALL_SIGNING_CONTEXT,
            &[&nonce.to_be_bytes()[..], &encoded[..]],
        ))
    }

    /// Sign `call` with `keypair` under `nonce`.
    pub fn sign(keypair: &ArcaKeypair, nonce: u64, call: VaultCall) -> Result<Self, CallError> {
        let digest = Self::signing_digest(nonce, &call)?;
        Ok(Self {
            caller: keypair.account_id(),
            nonce,
            signature: keypair.sign(&digest),
            call,
        })
    }

    /// Check the signature against `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::BadSignature`] on any mismatch or malformed key or
    /// signature, [`CallError::Encoding`] if the call cannot be encoded.
    pub fn verify(&self) -> Result<(), CallError> {
        let digest = Self::signing_digest(self.nonce, &self.call)?;
        verify_checked(&self.caller, &digest, &self.signature)?;
        Ok(())
    }
}
