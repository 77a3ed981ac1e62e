//! # ArcaDb: Persistent Vault Store
//!
//! sled-backed [`VaultStore`]. Three named trees:
//!
//! | Tree       | Key                  | Value                  |
//! |------------|----------------------|------------------------|
//! | `vaults`   | vault id (8B BE)     | `bincode(VaultRecord)` |
//! | `metadata` | key (UTF-8)          | value (bytes)          |
//! | `nonces`   | account id (32B)     | last nonce (8B BE)     |
//!
//! Vault ids are stored big-endian so sled's lexicographic order is numeric
//! order.
//!
//! ## Atomicity
//!
//! Creating a vault writes the record and bumps `next_vault_id` in one
//! multi-tree transaction. Either both land or neither does.
//!
//! ## Durability
//!
//! Store writes do not flush. Once a write returns `Ok` it is applied and
//! visible; reaching disk is sled's background flush or an explicit
//! [`ArcaDb::flush`]. A failed flush therefore never turns an applied
//! change into an error.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::debug;

use super::record::{VaultId, VaultRecord};
use super::store::{StoreError, StoreResult, VaultStore};
use crate::config::FIRST_VAULT_ID;
use crate::crypto::AccountId;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Well-known key in the `metadata` tree for the id counter.
const META_NEXT_VAULT_ID: &[u8] = b"next_vault_id";

fn decode_u64(bytes: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Serialization("expected 8-byte integer".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

// ---------------------------------------------------------------------------
// ArcaDb
// ---------------------------------------------------------------------------

/// Persistent storage for vault records and caller nonces.
///
/// Cloning is cheap; clones share the same sled instance.
#[derive(Debug, Clone)]
pub struct ArcaDb {
    db: Db,
    /// Vault records by id.
    vaults: Tree,
    /// Id counter and anything else that is a single well-known value.
    metadata: Tree,
    /// Highest accepted call nonce per account.
    nonces: Tree,
}

impl ArcaDb {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let this = Self::from_db(db)?;
        debug!(
            path = %path.display(),
            vaults = this.vaults.len(),
            "opened vault database"
        );
        Ok(this)
    }

    /// In-memory database, removed on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let vaults = db.open_tree("vaults")?;
        let metadata = db.open_tree("metadata")?;
        let nonces = db.open_tree("nonces")?;
        Ok(Self {
            db,
            vaults,
            metadata,
            nonces,
        })
    }

    // -- Nonces -------------------------------------------------------------

    /// Last accepted nonce for `account`, or `None` if it never submitted.
    pub fn get_nonce(&self, account: &AccountId) -> StoreResult<Option<u64>> {
        match self.nonces.get(account.as_bytes())? {
            Some(bytes) => Ok(Some(decode_u64(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Record `nonce` as the last accepted one for `account`.
    pub fn set_nonce(&self, account: &AccountId, nonce: u64) -> StoreResult<()> {
        self.nonces.insert(account.as_bytes(), &nonce.to_be_bytes())?;
        Ok(())
    }

    /// Force all pending writes to disk. Returns once they are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl VaultStore for ArcaDb {
    fn get_vault(&self, id: VaultId) -> StoreResult<Option<VaultRecord>> {
        match self.vaults.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn next_vault_id(&self) -> StoreResult<VaultId> {
        match self.metadata.get(META_NEXT_VAULT_ID)? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(FIRST_VAULT_ID),
        }
    }

    fn insert_vault(&mut self, record: VaultRecord) -> StoreResult<VaultId> {
        let bytes = bincode::serialize(&record)?;

        let result: Result<VaultId, TransactionError<StoreError>> =
            (&self.vaults, &self.metadata).transaction(|(vaults, metadata)| {
                let id = match metadata.get(META_NEXT_VAULT_ID)? {
                    Some(raw) => decode_u64(&raw).map_err(ConflictableTransactionError::Abort)?,
                    None => FIRST_VAULT_ID,
                };
                let next = id
                    .checked_add(1)
                    .ok_or(ConflictableTransactionError::Abort(StoreError::IdSpaceExhausted))?;
                vaults.insert(&id.to_be_bytes()[..], bytes.as_slice())?;
                metadata.insert(META_NEXT_VAULT_ID, &next.to_be_bytes()[..])?;
                Ok(id)
            });

        let id = match result {
            Ok(id) => id,
            Err(TransactionError::Abort(err)) => return Err(err),
            Err(TransactionError::Storage(err)) => return Err(err.into()),
        };
        Ok(id)
    }

    fn put_vault(&mut self, id: VaultId, record: &VaultRecord) -> StoreResult<()> {
        let bytes = bincode::serialize(record)?;
        self.vaults.insert(id.to_be_bytes(), bytes)?;
        Ok(())
    }

    fn remove_vault(&mut self, id: VaultId) -> StoreResult<Option<VaultRecord>> {
        let removed = match self.vaults.remove(id.to_be_bytes())? {
            Some(bytes) => Some(bincode::deserialize(&bytes)?),
            None => None,
        };
        Ok(removed)
    }

    fn vault_count(&self) -> StoreResult<usize> {
        Ok(self.vaults.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "QmPvNDeFhpN5WxLmnQ7f2WS7si3CtF1qr5VorDg6E1EL2A";

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    fn record(owner: u8) -> VaultRecord {
        VaultRecord::new(account(owner), CID.parse().unwrap())
    }

    #[test]
    fn open_temporary_database() {
        let db = ArcaDb::open_temporary().expect("should create temp db");
        assert_eq!(db.vault_count().unwrap(), 0);
        assert_eq!(db.next_vault_id().unwrap(), FIRST_VAULT_ID);
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let mut db = ArcaDb::open_temporary().unwrap();
        assert_eq!(db.insert_vault(record(1)).unwrap(), 0);
        assert_eq!(db.insert_vault(record(2)).unwrap(), 1);
        assert_eq!(db.insert_vault(record(3)).unwrap(), 2);
        assert_eq!(db.next_vault_id().unwrap(), 3);
        assert_eq!(db.vault_count().unwrap(), 3);
    }

    #[test]
    fn store_and_retrieve_record() {
        let mut db = ArcaDb::open_temporary().unwrap();
        let mut rec = record(1);
        rec.members.insert(account(2));
        let id = db.insert_vault(rec.clone()).unwrap();

        let retrieved = db.get_vault(id).unwrap().expect("vault should exist");
        assert_eq!(retrieved, rec);
        assert!(db.get_vault(id + 1).unwrap().is_none());
    }

    #[test]
    fn put_vault_overwrites() {
        let mut db = ArcaDb::open_temporary().unwrap();
        let id = db.insert_vault(record(1)).unwrap();

        let mut updated = record(1);
        updated.members.insert(account(7));
        db.put_vault(id, &updated).unwrap();

        assert_eq!(db.get_vault(id).unwrap(), Some(updated));
        assert_eq!(db.vault_count().unwrap(), 1);
    }

    #[test]
    fn remove_keeps_counter() {
        let mut db = ArcaDb::open_temporary().unwrap();
        let id = db.insert_vault(record(1)).unwrap();

        assert_eq!(db.remove_vault(id).unwrap(), Some(record(1)));
        assert!(db.remove_vault(id).unwrap().is_none());
        assert!(db.get_vault(id).unwrap().is_none());
        assert_eq!(db.insert_vault(record(1)).unwrap(), id + 1);
    }

    #[test]
    fn exhausted_counter_aborts_without_writing() {
        let mut db = ArcaDb::open_temporary().unwrap();
        db.metadata
            .insert(META_NEXT_VAULT_ID, &u64::MAX.to_be_bytes())
            .unwrap();

        assert_eq!(
            db.insert_vault(record(1)),
            Err(StoreError::IdSpaceExhausted)
        );
        assert_eq!(db.vault_count().unwrap(), 0);
        assert_eq!(db.next_vault_id().unwrap(), u64::MAX);
    }

    #[test]
    fn corrupt_counter_is_a_serialization_error() {
        let mut db = ArcaDb::open_temporary().unwrap();
        db.metadata
            .insert(META_NEXT_VAULT_ID, &[1u8, 2, 3][..])
            .unwrap();

        assert!(matches!(
            db.next_vault_id(),
            Err(StoreError::Serialization(_))
        ));
        assert!(matches!(
            db.insert_vault(record(1)),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn nonce_tracking() {
        let db = ArcaDb::open_temporary().unwrap();
        assert_eq!(db.get_nonce(&account(1)).unwrap(), None);

        db.set_nonce(&account(1), 5).unwrap();
        db.set_nonce(&account(2), 9).unwrap();
        assert_eq!(db.get_nonce(&account(1)).unwrap(), Some(5));
        assert_eq!(db.get_nonce(&account(2)).unwrap(), Some(9));

        db.set_nonce(&account(1), 6).unwrap();
        assert_eq!(db.get_nonce(&account(1)).unwrap(), Some(6));
    }

    #[test]
    fn reopen_preserves_records_counter_and_nonces() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut db = ArcaDb::open(dir.path()).expect("should open db");
            db.insert_vault(record(1)).unwrap();
            let burnt = db.insert_vault(record(2)).unwrap();
            db.remove_vault(burnt).unwrap();
            db.set_nonce(&account(1), 42).unwrap();
            db.flush().unwrap();
        }

        let mut db = ArcaDb::open(dir.path()).expect("should reopen db");
        assert_eq!(db.vault_count().unwrap(), 1);
        assert_eq!(db.get_vault(0).unwrap(), Some(record(1)));
        assert!(db.get_vault(1).unwrap().is_none());
        assert_eq!(db.next_vault_id().unwrap(), 2);
        assert_eq!(db.get_nonce(&account(1)).unwrap(), Some(42));
        assert_eq!(db.insert_vault(record(3)).unwrap(), 2);
    }

    #[test]
    fn writes_are_visible_without_flush() {
        let mut db = ArcaDb::open_temporary().unwrap();
        let view = db.clone();

        let id = db.insert_vault(record(1)).unwrap();
        let mut updated = record(1);
        updated.members.insert(account(2));
        db.put_vault(id, &updated).unwrap();
        db.set_nonce(&account(1), 3).unwrap();
        assert_eq!(view.get_vault(id).unwrap(), Some(updated));
        assert_eq!(view.get_nonce(&account(1)).unwrap(), Some(3));

        assert!(db.remove_vault(id).unwrap().is_some());
        assert!(view.get_vault(id).unwrap().is_none());
        assert_eq!(view.next_vault_id().unwrap(), 1);
    }

    #[test]
    fn clones_share_state() {
        let mut db = ArcaDb::open_temporary().unwrap();
        let view = db.clone();
        let id = db.insert_vault(record(1)).unwrap();
        assert_eq!(view.get_vault(id).unwrap(), Some(record(1)));
    }
}
