// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Arca Contracts
//!
//! The vault access-control ledger and the messages that drive it.
//!
//! - **Vault Ledger**: vault records, the owner/member permission model,
//!   content-identifier validation on every write, and one event per
//!   successful state change.
//! - **Calls**: the five mutating operations as a serializable enum, and a
//!   signed envelope that ties a call to an Ed25519 key and a nonce.
//!
//! ## Design Principles
//!
//! 1. Errors are values. A rejected call leaves state exactly as it was and
//!    emits nothing.
//! 2. A read-only probe of a call reports exactly what executing it would.
//! 3. The ledger is generic over its store; the same rules run in memory and
//!    on sled.

pub mod call;
pub mod vault_ledger;
