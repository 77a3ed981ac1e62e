//! # Hashing Utilities
//!
//! BLAKE3, and only BLAKE3. Arca hashes exactly one kind of thing: the
//! signable body of a vault call. `derive_key` mode keeps those digests from
//! ever colliding with a digest computed for some other purpose with the
//! same key.

/// Domain-separated BLAKE3 over several parts, fed sequentially into the
/// hasher instead of concatenated into a temporary buffer.
///
/// # Example
///
/// ```
/// use arca_protocol::crypto::domain_separated_hash_multi;
///
/// let digest = domain_separated_hash_multi("arca example", &[b"vault", b"0"]);
/// assert_eq!(digest.len(), 32);
/// ```
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
