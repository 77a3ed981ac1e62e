//! # Vault Ledger Contract
//!
//! Binds a content identifier to an owner and a set of members, and decides
//! who may change it. The rules:
//!
//! - **Anyone** can create a vault and becomes its owner.
//! - **Owner or member** can update the metadata.
//! - **Owner only** can nominate or remove members and burn the vault.
//! - Every metadata write must be a valid CIDv0 (see [`arca_protocol::cid`]).
//!
//! A vault that does not exist has no owner and no members, so every
//! mutating call against it fails with [`VaultError::AccessDenied`]. Queries
//! against it return `None` / `false`.
//!
//! ## Plan, then apply
//!
//! Each transaction is first *planned*: a read-only pass that checks
//! authorization and input and computes the new record and event. Only then
//! is the plan *applied* to the store. [`VaultLedger::probe`] runs the plan
//! step alone, so it always reports exactly what [`VaultLedger::execute`]
//! would.
//!
//! ## Check order
//!
//! Authorization is checked before metadata validity. An outsider updating a
//! vault with a garbage identifier gets `AccessDenied`, not
//! `MetadataNotValid`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use arca_protocol::cid::ContentId;
use arca_protocol::crypto::AccountId;
use arca_protocol::storage::{
    MemoryStore, StoreError, StoreResult, VaultId, VaultRecord, VaultStore,
};

use crate::call::VaultCall;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The metadata is not a syntactically valid content identifier.
    #[error("metadata is not a valid content identifier")]
    MetadataNotValid,

    /// The caller lacks the role this operation needs, or the vault does not
    /// exist.
    #[error("access denied")]
    AccessDenied,

    /// The backing store failed. Never produced by [`MemoryStore`].
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl VaultError {
    /// Stable name for the error class, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::MetadataNotValid => "MetadataNotValid",
            VaultError::AccessDenied => "AccessDenied",
            VaultError::Storage(_) => "Storage",
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Emitted once per successful transaction that changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VaultEvent {
    VaultCreation {
        vault_id: VaultId,
        owner: AccountId,
    },
    VaultUpdate {
        vault_id: VaultId,
        updated_by: AccountId,
    },
    MembershipGranted {
        vault_id: VaultId,
        owner: AccountId,
        member: AccountId,
    },
    MembershipRevoked {
        vault_id: VaultId,
        owner: AccountId,
        member: AccountId,
    },
    VaultBurnt {
        vault_id: VaultId,
        owner: AccountId,
    },
}

impl VaultEvent {
    pub fn vault_id(&self) -> VaultId {
        match self {
            VaultEvent::VaultCreation { vault_id, .. }
            | VaultEvent::VaultUpdate { vault_id, .. }
            | VaultEvent::MembershipGranted { vault_id, .. }
            | VaultEvent::MembershipRevoked { vault_id, .. }
            | VaultEvent::VaultBurnt { vault_id, .. } => *vault_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::VaultCreation { .. } => "VaultCreation",
            VaultEvent::VaultUpdate { .. } => "VaultUpdate",
            VaultEvent::MembershipGranted { .. } => "MembershipGranted",
            VaultEvent::MembershipRevoked { .. } => "MembershipRevoked",
            VaultEvent::VaultBurnt { .. } => "VaultBurnt",
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// What a transaction will do to the store once it is applied.
#[derive(Debug)]
enum Effect {
    Create(VaultRecord),
    Put {
        vault_id: VaultId,
        record: VaultRecord,
        event: VaultEvent,
    },
    Remove {
        vault_id: VaultId,
        event: VaultEvent,
    },
    /// Authorized, valid, and nothing to change.
    Unchanged { vault_id: VaultId },
}

fn parse_metadata(candidate: &str) -> Result<ContentId, VaultError> {
    ContentId::parse(candidate).map_err(|_| VaultError::MetadataNotValid)
}

// ---------------------------------------------------------------------------
// VaultLedger
// ---------------------------------------------------------------------------

/// The ledger: a store of vault records plus the events not yet collected.
///
/// Transactions take `&mut self` and queries take `&self`, so the borrow
/// checker already serializes calls; a host sharing a ledger across tasks
/// wraps it in one lock.
#[derive(Debug, Clone, Default)]
pub struct VaultLedger<S = MemoryStore> {
    store: S,
    pending: Vec<VaultEvent>,
}

impl VaultLedger<MemoryStore> {
    /// An empty in-memory ledger.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl<S: VaultStore> VaultLedger<S> {
    /// A ledger over an existing store. Records already in it are live.
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            pending: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // -- Queries ------------------------------------------------------------

    /// Full snapshot of a vault, members included.
    pub fn vault(&self, vault_id: VaultId) -> StoreResult<Option<VaultRecord>> {
        self.store.get_vault(vault_id)
    }

    pub fn owner_of(&self, vault_id: VaultId) -> StoreResult<Option<AccountId>> {
        Ok(self.store.get_vault(vault_id)?.map(|record| record.owner))
    }

    pub fn get_metadata(&self, vault_id: VaultId) -> StoreResult<Option<ContentId>> {
        Ok(self.store.get_vault(vault_id)?.map(|record| record.metadata))
    }

    /// `true` iff the vault exists and `account` owns it.
    pub fn authorize_owner(&self, vault_id: VaultId, account: &AccountId) -> StoreResult<bool> {
        Ok(self
            .store
            .get_vault(vault_id)?
            .is_some_and(|record| record.is_owner(account)))
    }

    /// `true` iff the vault exists and `account` was nominated to it. The
    /// owner is not a member unless it nominated itself.
    pub fn authorize_member(&self, vault_id: VaultId, account: &AccountId) -> StoreResult<bool> {
        Ok(self
            .store
            .get_vault(vault_id)?
            .is_some_and(|record| record.is_member(account)))
    }

    /// Owner or member.
    pub fn is_authorized_to_edit(
        &self,
        vault_id: VaultId,
        account: &AccountId,
    ) -> StoreResult<bool> {
        Ok(self
            .store
            .get_vault(vault_id)?
            .is_some_and(|record| record.can_edit(account)))
    }

    /// Number of live vaults.
    pub fn vault_count(&self) -> StoreResult<usize> {
        self.store.vault_count()
    }

    /// Id the next successful `create_vault` will return.
    pub fn next_vault_id(&self) -> StoreResult<VaultId> {
        self.store.next_vault_id()
    }

    // -- Transactions -------------------------------------------------------

    /// Create a vault owned by `caller` and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MetadataNotValid`] if `metadata` is not a valid
    /// content identifier.
    pub fn create_vault(
        &mut self,
        caller: &AccountId,
        metadata: &str,
    ) -> Result<VaultId, VaultError> {
        let call = VaultCall::CreateVault {
            metadata: metadata.to_owned(),
        };
        self.run(caller, &call).map(|(vault_id, _)| vault_id)
    }

    /// Replace the metadata of a vault.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AccessDenied`] unless `caller` is the owner or a
    /// member, then [`VaultError::MetadataNotValid`] if `metadata` is invalid.
    pub fn update_metadata(
        &mut self,
        caller: &AccountId,
        vault_id: VaultId,
        metadata: &str,
    ) -> Result<(), VaultError> {
        let call = VaultCall::UpdateMetadata {
            vault_id,
            metadata: metadata.to_owned(),
        };
        self.run(caller, &call).map(|_| ())
    }

    /// Add `member` to a vault. Nominating an existing member succeeds and
    /// emits the event again.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AccessDenied`] unless `caller` is the owner.
    pub fn nominate_member(
        &mut self,
        caller: &AccountId,
        vault_id: VaultId,
        member: &AccountId,
    ) -> Result<(), VaultError> {
        let call = VaultCall::NominateMember {
            vault_id,
            member: *member,
        };
        self.run(caller, &call).map(|_| ())
    }

    /// Remove `member` from a vault. Removing an account that is not a
    /// member succeeds without emitting anything.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AccessDenied`] unless `caller` is the owner.
    pub fn remove_member(
        &mut self,
        caller: &AccountId,
        vault_id: VaultId,
        member: &AccountId,
    ) -> Result<(), VaultError> {
        let call = VaultCall::RemoveMember {
            vault_id,
            member: *member,
        };
        self.run(caller, &call).map(|_| ())
    }

    /// Delete a vault. Its id is never handed out again.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::AccessDenied`] unless `caller` is the owner.
    pub fn burn_vault(&mut self, caller: &AccountId, vault_id: VaultId) -> Result<(), VaultError> {
        self.run(caller, &VaultCall::BurnVault { vault_id }).map(|_| ())
    }

    /// Run any call and return the event it emitted, if any.
    pub fn execute(
        &mut self,
        caller: &AccountId,
        call: &VaultCall,
    ) -> Result<Option<VaultEvent>, VaultError> {
        self.run(caller, call).map(|(_, event)| event)
    }

    /// Evaluate `call` without applying it.
    ///
    /// Returns `Ok(())` if [`execute`](Self::execute) would succeed right now,
    /// otherwise the same error it would return.
    pub fn probe(&self, caller: &AccountId, call: &VaultCall) -> Result<(), VaultError> {
        self.plan(caller, call).map(|_| ())
    }

    // -- Events -------------------------------------------------------------

    /// Events emitted since the last [`drain_events`](Self::drain_events),
    /// oldest first.
    pub fn events(&self) -> &[VaultEvent] {
        &self.pending
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.pending)
    }

    // -- Internals ----------------------------------------------------------

    fn run(
        &mut self,
        caller: &AccountId,
        call: &VaultCall,
    ) -> Result<(VaultId, Option<VaultEvent>), VaultError> {
        let outcome = match self.plan(caller, call) {
            Ok(effect) => self.apply(effect),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok((vault_id, event)) => info!(
                op = call.name(),
                vault_id = *vault_id,
                caller = %caller,
                event = event.as_ref().map(VaultEvent::name),
                "vault call applied"
            ),
            Err(err) => debug!(
                op = call.name(),
                vault_id = ?call.vault_id(),
                caller = %caller,
                error = %err,
                "vault call rejected"
            ),
        }
        outcome
    }

    fn plan(&self, caller: &AccountId, call: &VaultCall) -> Result<Effect, VaultError> {
        match call {
            VaultCall::CreateVault { metadata } => {
                let metadata = parse_metadata(metadata)?;
                Ok(Effect::Create(VaultRecord::new(*caller, metadata)))
            }
            VaultCall::UpdateMetadata { vault_id, metadata } => {
                let vault_id = *vault_id;
                let mut record = self.editable_by(vault_id, caller)?;
                record.metadata = parse_metadata(metadata)?;
                Ok(Effect::Put {
                    vault_id,
                    record,
                    event: VaultEvent::VaultUpdate {
                        vault_id,
                        updated_by: *caller,
                    },
                })
            }
            VaultCall::NominateMember { vault_id, member } => {
                let vault_id = *vault_id;
                let mut record = self.owned_by(vault_id, caller)?;
                record.members.insert(*member);
                Ok(Effect::Put {
                    vault_id,
                    record,
                    event: VaultEvent::MembershipGranted {
                        vault_id,
                        owner: *caller,
                        member: *member,
                    },
                })
            }
            VaultCall::RemoveMember { vault_id, member } => {
                let vault_id = *vault_id;
                let mut record = self.owned_by(vault_id, caller)?;
                if !record.members.remove(member) {
                    return Ok(Effect::Unchanged { vault_id });
                }
                Ok(Effect::Put {
                    vault_id,
                    record,
                    event: VaultEvent::MembershipRevoked {
                        vault_id,
                        owner: *caller,
                        member: *member,
                    },
                })
            }
            VaultCall::BurnVault { vault_id } => {
                let vault_id = *vault_id;
                self.owned_by(vault_id, caller)?;
                Ok(Effect::Remove {
                    vault_id,
                    event: VaultEvent::VaultBurnt {
                        vault_id,
                        owner: *caller,
                    },
                })
            }
        }
    }

    fn apply(&mut self, effect: Effect) -> Result<(VaultId, Option<VaultEvent>), VaultError> {
        let (vault_id, event) = match effect {
            Effect::Create(record) => {
                let owner = record.owner;
                let vault_id = self.store.insert_vault(record)?;
                (vault_id, Some(VaultEvent::VaultCreation { vault_id, owner }))
            }
            Effect::Put {
                vault_id,
                record,
                event,
            } => {
                self.store.put_vault(vault_id, &record)?;
                (vault_id, Some(event))
            }
            Effect::Remove { vault_id, event } => {
                self.store.remove_vault(vault_id)?;
                (vault_id, Some(event))
            }
            Effect::Unchanged { vault_id } => (vault_id, None),
        };

        if let Some(event) = &event {
            self.pending.push(event.clone());
        }
        Ok((vault_id, event))
    }

    fn owned_by(&self, vault_id: VaultId, caller: &AccountId) -> Result<VaultRecord, VaultError> {
        match self.store.get_vault(vault_id)? {
            Some(record) if record.is_owner(caller) => Ok(record),
            _ => Err(VaultError::AccessDenied),
        }
    }

    fn editable_by(
        &self,
        vault_id: VaultId,
        caller: &AccountId,
    ) -> Result<VaultRecord, VaultError> {
        match self.store.get_vault(vault_id)? {
            Some(record) if record.can_edit(caller) => Ok(record),
            _ => Err(VaultError::AccessDenied),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
