// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Arca Protocol Core Library
//!
//! The primitives every other Arca crate builds on. Nothing in here knows
//! what a vault *operation* is; that lives in `arca-contracts`. This crate
//! only knows what a vault *is* and where it is kept.
//!
//! ## Modules
//!
//! - **config**: Protocol constants. Byte lengths, the signing domain tag,
//!   default ports.
//! - **crypto**: Ed25519 accounts and signatures, BLAKE3 hashing.
//! - **cid**: Content-identifier validation. Format only; the content itself
//!   is never fetched.
//! - **storage**: Vault records, the `VaultStore` trait, an in-memory store
//!   and the sled-backed `ArcaDb`.
//!
//! ## Ground Rules
//!
//! 1. A `ContentId` can only be built through validation.
//! 2. No `unsafe`.
//! 3. Storage failures are values, never panics.

pub mod cid;
pub mod config;
pub mod crypto;
pub mod storage;
