//! Vault records as they are stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cid::ContentId;
use crate::crypto::AccountId;

/// Vault identifier. Assigned in creation order starting at 0, never reused.
pub type VaultId = u64;

/// Everything the ledger knows about one live vault.
///
/// A burnt vault has no record at all; there is no tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// The creating account. Never changes.
    pub owner: AccountId,
    /// Accounts nominated by the owner. The owner is not implicitly a member.
    pub members: BTreeSet<AccountId>,
    /// Current content pointer.
    pub metadata: ContentId,
}

impl VaultRecord {
    /// A freshly created vault: no members yet.
    pub fn new(owner: AccountId, metadata: ContentId) -> Self {
        Self {
            owner,
            members: BTreeSet::new(),
            metadata,
        }
    }

    pub fn is_owner(&self, account: &AccountId) -> bool {
        self.owner == *account
    }

    pub fn is_member(&self, account: &AccountId) -> bool {
        self.members.contains(account)
    }

    /// Owner or member.
    pub fn can_edit(&self, account: &AccountId) -> bool {
        self.is_owner(account) || self.is_member(account)
    }
}
