//! # Cryptographic Primitives for Arca
//!
//! Ed25519 for caller signatures, BLAKE3 for call digests. Both are thin
//! wrappers around audited crates; nothing here is hand-rolled.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::domain_separated_hash_multi;
pub use keys::{AccountId, ArcaKeypair, ArcaSignature, KeyError};
pub use signatures::{verify_checked, SignatureError};
