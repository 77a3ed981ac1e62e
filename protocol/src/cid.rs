//! # Content Identifiers
//!
//! Vault metadata is a pointer to content stored elsewhere (IPFS, typically).
//! The ledger never resolves it. It only checks that the string *looks* like
//! a CIDv0:
//!
//! 1. exactly [`CID_V0_LENGTH`] characters,
//! 2. starts with [`CID_V0_PREFIX`],
//! 3. every character is in the base58btc alphabet.
//!
//! That is a syntax check, not a multihash decode. A string that passes may
//! still name content nobody has.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{CID_V0_LENGTH, CID_V0_PREFIX};

/// Why a string was rejected as a content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentIdError {
    #[error("wrong length: expected {expected} characters, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("missing CIDv0 prefix \"Qm\"")]
    MissingPrefix,

    #[error("character outside the base58btc alphabet")]
    InvalidAlphabet,
}

/// Check a candidate content identifier, reporting the first rule it breaks.
pub fn validate_content_id(candidate: &str) -> Result<(), ContentIdError> {
    // `len()` counts bytes; a non-ASCII string of 46 bytes still fails the
    // alphabet check below.
    if candidate.len() != CID_V0_LENGTH {
        return Err(ContentIdError::WrongLength {
            expected: CID_V0_LENGTH,
            actual: candidate.chars().count(),
        });
    }
    if !candidate.starts_with(CID_V0_PREFIX) {
        return Err(ContentIdError::MissingPrefix);
    }
    bs58::decode(candidate)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|_| ContentIdError::InvalidAlphabet)?;
    Ok(())
}

/// Pure predicate form of [`validate_content_id`].
pub fn is_valid_content_id(candidate: &str) -> bool {
    validate_content_id(candidate).is_ok()
}

/// A syntactically valid content identifier.
///
/// The only ways to build one go through validation, so holding a
/// `ContentId` is proof the string passed. Deserialization validates too;
/// a corrupted record fails to load rather than smuggling a bad value in.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Validate and wrap.
    pub fn parse(candidate: &str) -> Result<Self, ContentIdError> {
        validate_content_id(candidate)?;
        Ok(Self(candidate.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentId {
    type Error = ContentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_content_id(&value)?;
        Ok(Self(value))
    }
}

impl From<ContentId> for String {
    fn from(cid: ContentId) -> Self {
        cid.0
    }
}

impl FromStr for ContentId {
    type Err = ContentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}
