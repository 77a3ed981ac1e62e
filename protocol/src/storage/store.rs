//! The [`VaultStore`] seam and its in-memory implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::record::{VaultId, VaultRecord};
use crate::config::FIRST_VAULT_ID;

/// Errors raised by a storage backend.
///
/// Backend errors are flattened to strings so the error stays `Clone` and
/// comparable; nothing upstream branches on the sled error kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("vault id space exhausted")]
    IdSpaceExhausted,
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent home of vault records and the id counter.
///
/// Implementations must make [`insert_vault`](Self::insert_vault) atomic:
/// the record lands and the counter advances together, or neither does.
pub trait VaultStore {
    /// The record for `id`, or `None` if it was never created or was burnt.
    fn get_vault(&self, id: VaultId) -> StoreResult<Option<VaultRecord>>;

    /// The id the next [`insert_vault`](Self::insert_vault) will assign.
    fn next_vault_id(&self) -> StoreResult<VaultId>;

    /// Allocate the next id and store `record` under it.
    fn insert_vault(&mut self, record: VaultRecord) -> StoreResult<VaultId>;

    /// Overwrite the record of an existing vault.
    fn put_vault(&mut self, id: VaultId, record: &VaultRecord) -> StoreResult<()>;

    /// Delete a vault. The id is not released for reuse.
    fn remove_vault(&mut self, id: VaultId) -> StoreResult<Option<VaultRecord>>;

    /// Number of live (not burnt) vaults.
    fn vault_count(&self) -> StoreResult<usize>;
}

/// `BTreeMap`-backed store. Infallible in practice; every method returns
/// `Ok` except id exhaustion at `u64::MAX`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    vaults: BTreeMap<VaultId, VaultRecord>,
    next_id: VaultId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            vaults: BTreeMap::new(),
            next_id: FIRST_VAULT_ID,
        }
    }
}

impl VaultStore for MemoryStore {
    fn get_vault(&self, id: VaultId) -> StoreResult<Option<VaultRecord>> {
        Ok(self.vaults.get(&id).cloned())
    }

    fn next_vault_id(&self) -> StoreResult<VaultId> {
        Ok(self.next_id)
    }

    fn insert_vault(&mut self, record: VaultRecord) -> StoreResult<VaultId> {
        let id = self.next_id;
        let next = id.checked_add(1).ok_or(StoreError::IdSpaceExhausted)?;
        self.vaults.insert(id, record);
        self.next_id = next;
        Ok(id)
    }

    fn put_vault(&mut self, id: VaultId, record: &VaultRecord) -> StoreResult<()> {
        self.vaults.insert(id, record.clone());
        Ok(())
    }

    fn remove_vault(&mut self, id: VaultId) -> StoreResult<Option<VaultRecord>> {
        Ok(self.vaults.remove(&id))
    }

    fn vault_count(&self) -> StoreResult<usize> {
        Ok(self.vaults.len())
    }
}
