//! # Storage Module
//!
//! Vault records and the stores that hold them.
//!
//! ```text
//! record.rs : VaultId, VaultRecord
//! store.rs  : VaultStore trait, StoreError, in-memory MemoryStore
//! db.rs     : ArcaDb: sled persistence with named trees
//! ```
//!
//! The ledger contract is generic over [`VaultStore`], so the same
//! authorization logic runs against a `BTreeMap` in tests and against sled
//! in the node. A store only persists what it is told to; it enforces no
//! authorization of its own.

pub mod db;
pub mod record;
pub mod store;

pub use db::ArcaDb;
pub use record::{VaultId, VaultRecord};
pub use store::{MemoryStore, StoreError, StoreResult, VaultStore};
