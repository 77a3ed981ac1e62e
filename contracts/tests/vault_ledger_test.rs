//! Integration tests for the vault ledger.
//!
//! Walks the ledger through the scenarios it has to get right: id
//! allocation, ownership, CID validation, membership changes, burning, and
//! isolation between vaults. The last section reruns the core flow on the
//! sled-backed store.

use arca_contracts::call::VaultCall;
use arca_contracts::vault_ledger::{VaultError, VaultEvent, VaultLedger};
use arca_protocol::crypto::AccountId;
use arca_protocol::storage::{ArcaDb, VaultStore};

const CID: &str = "QmPvNDeFhpN5WxLmnQ7f2WS7si3CtF1qr5VorDg6E1EL2A";
const CID_2: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
const BAD_CID: &str = "bad metadata";

fn alice() -> AccountId {
    AccountId::from_bytes([0xa1; 32])
}

fn bob() -> AccountId {
    AccountId::from_bytes([0xb0; 32])
}

fn carol() -> AccountId {
    AccountId::from_bytes([0xc4; 32])
}

/// Vault 0 owned by alice with bob as member.
fn ledger_with_member() -> VaultLedger {
    let mut ledger = VaultLedger::new();
    ledger.create_vault(&alice(), CID).unwrap();
    ledger.nominate_member(&alice(), 0, &bob()).unwrap();
    ledger.drain_events();
    ledger
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn ids_are_assigned_in_creation_order() {
    let mut ledger = VaultLedger::new();
    for expected in 0..5u64 {
        assert_eq!(ledger.next_vault_id().unwrap(), expected);
        assert_eq!(ledger.create_vault(&alice(), CID).unwrap(), expected);
    }
    assert_eq!(ledger.vault_count().unwrap(), 5);
}

#[test]
fn failed_creation_does_not_consume_an_id() {
    let mut ledger = VaultLedger::new();
    assert_eq!(
        ledger.create_vault(&alice(), BAD_CID),
        Err(VaultError::MetadataNotValid)
    );
    assert_eq!(ledger.create_vault(&alice(), CID).unwrap(), 0);
}

#[test]
fn creator_is_sole_owner() {
    let mut ledger = VaultLedger::new();
    let id = ledger.create_vault(&alice(), CID).unwrap();

    assert_eq!(ledger.owner_of(id).unwrap(), Some(alice()));
    assert!(ledger.authorize_owner(id, &alice()).unwrap());
    assert!(!ledger.authorize_owner(id, &bob()).unwrap());
    assert!(!ledger.authorize_member(id, &alice()).unwrap());
    assert_eq!(ledger.get_metadata(id).unwrap().unwrap().as_str(), CID);

    let record = ledger.vault(id).unwrap().unwrap();
    assert!(record.members.is_empty());
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[test]
fn valid_cid_accepted_by_create_and_update() {
    let mut ledger = VaultLedger::new();
    let id = ledger.create_vault(&alice(), CID).unwrap();
    ledger.update_metadata(&alice(), id, CID_2).unwrap();
    assert_eq!(ledger.get_metadata(id).unwrap().unwrap().as_str(), CID_2);
    ledger.update_metadata(&alice(), id, CID).unwrap();
    assert_eq!(ledger.get_metadata(id).unwrap().unwrap().as_str(), CID);
}

#[test]
fn invalid_update_leaves_metadata_and_events_untouched() {
    let mut ledger = ledger_with_member();
    assert_eq!(
        ledger.update_metadata(&alice(), 0, BAD_CID),
        Err(VaultError::MetadataNotValid)
    );
    assert_eq!(
        ledger.update_metadata(&bob(), 0, BAD_CID),
        Err(VaultError::MetadataNotValid)
    );
    assert_eq!(ledger.get_metadata(0).unwrap().unwrap().as_str(), CID);
    assert!(ledger.events().is_empty());
}

#[test]
fn owner_and_member_can_update_outsider_cannot() {
    let mut ledger = ledger_with_member();

    ledger.update_metadata(&alice(), 0, CID_2).unwrap();
    ledger.update_metadata(&bob(), 0, CID).unwrap();

    let outsider_call = VaultCall::UpdateMetadata {
        vault_id: 0,
        metadata: CID_2.into(),
    };
    assert_eq!(
        ledger.probe(&carol(), &outsider_call),
        Err(VaultError::AccessDenied)
    );
    assert_eq!(
        ledger.execute(&carol(), &outsider_call),
        Err(VaultError::AccessDenied)
    );
    assert_eq!(ledger.get_metadata(0).unwrap().unwrap().as_str(), CID);

    assert_eq!(
        ledger.drain_events(),
        vec![
            VaultEvent::VaultUpdate {
                vault_id: 0,
                updated_by: alice()
            },
            VaultEvent::VaultUpdate {
                vault_id: 0,
                updated_by: bob()
            },
        ]
    );
}

#[test]
fn update_on_missing_vault_is_access_denied() {
    let mut ledger = VaultLedger::new();
    assert_eq!(
        ledger.update_metadata(&alice(), 0, CID),
        Err(VaultError::AccessDenied)
    );
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[test]
fn nominate_twice_keeps_member_authorized() {
    let mut ledger = VaultLedger::new();
    let id = ledger.create_vault(&alice(), CID).unwrap();
    ledger.drain_events();

    ledger.nominate_member(&alice(), id, &bob()).unwrap();
    ledger.nominate_member(&alice(), id, &bob()).unwrap();

    assert!(ledger.authorize_member(id, &bob()).unwrap());
    assert_eq!(ledger.vault(id).unwrap().unwrap().members.len(), 1);
    let granted = VaultEvent::MembershipGranted {
        vault_id: id,
        owner: alice(),
        member: bob(),
    };
    assert_eq!(ledger.drain_events(), vec![granted.clone(), granted]);
}

#[test]
fn remove_member_revokes_and_emits() {
    let mut ledger = ledger_with_member();
    ledger.remove_member(&alice(), 0, &bob()).unwrap();

    assert!(!ledger.authorize_member(0, &bob()).unwrap());
    assert_eq!(
        ledger.update_metadata(&bob(), 0, CID_2),
        Err(VaultError::AccessDenied)
    );
    assert_eq!(
        ledger.events(),
        &[VaultEvent::MembershipRevoked {
            vault_id: 0,
            owner: alice(),
            member: bob()
        }]
    );
}

#[test]
fn removing_non_member_is_a_no_op() {
    let mut ledger = ledger_with_member();
    ledger.remove_member(&alice(), 0, &carol()).unwrap();
    assert!(ledger.events().is_empty());
    assert!(ledger.authorize_member(0, &bob()).unwrap());
}

#[test]
fn only_owner_manages_membership_and_burns() {
    let mut ledger = ledger_with_member();

    for caller in [bob(), carol()] {
        assert_eq!(
            ledger.nominate_member(&caller, 0, &carol()),
            Err(VaultError::AccessDenied)
        );
        assert_eq!(
            ledger.remove_member(&caller, 0, &bob()),
            Err(VaultError::AccessDenied)
        );
        assert_eq!(ledger.burn_vault(&caller, 0), Err(VaultError::AccessDenied));

        for call in [
            VaultCall::NominateMember {
                vault_id: 0,
                member: carol(),
            },
            VaultCall::RemoveMember {
                vault_id: 0,
                member: bob(),
            },
            VaultCall::BurnVault { vault_id: 0 },
        ] {
            assert_eq!(ledger.probe(&caller, &call), Err(VaultError::AccessDenied));
        }
    }

    assert!(ledger.authorize_member(0, &bob()).unwrap());
    assert!(!ledger.authorize_member(0, &carol()).unwrap());
    assert!(ledger.vault(0).unwrap().is_some());
    assert!(ledger.events().is_empty());
}

#[test]
fn owner_may_nominate_itself() {
    let mut ledger = VaultLedger::new();
    let id = ledger.create_vault(&alice(), CID).unwrap();
    ledger.nominate_member(&alice(), id, &alice()).unwrap();
    assert!(ledger.authorize_member(id, &alice()).unwrap());
    assert!(ledger.authorize_owner(id, &alice()).unwrap());
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

#[test]
fn vaults_do_not_share_roles() {
    let mut ledger = VaultLedger::new();
    let v0 = ledger.create_vault(&alice(), CID).unwrap();
    let v1 = ledger.create_vault(&bob(), CID).unwrap();
    ledger.nominate_member(&alice(), v0, &carol()).unwrap();

    assert!(ledger.authorize_owner(v0, &alice()).unwrap());
    assert!(!ledger.authorize_owner(v1, &alice()).unwrap());
    assert!(ledger.authorize_owner(v1, &bob()).unwrap());
    assert!(!ledger.authorize_owner(v0, &bob()).unwrap());
    assert!(!ledger.authorize_member(v1, &carol()).unwrap());
    assert!(!ledger.authorize_member(v1, &alice()).unwrap());
    assert!(!ledger.authorize_member(v0, &bob()).unwrap());

    assert_eq!(
        ledger.update_metadata(&carol(), v1, CID_2),
        Err(VaultError::AccessDenied)
    );
    assert_eq!(ledger.burn_vault(&alice(), v1), Err(VaultError::AccessDenied));

    ledger.burn_vault(&alice(), v0).unwrap();
    assert_eq!(ledger.owner_of(v1).unwrap(), Some(bob()));
    assert_eq!(ledger.get_metadata(v1).unwrap().unwrap().as_str(), CID);
}

// ---------------------------------------------------------------------------
// Burning
// ---------------------------------------------------------------------------

#[test]
fn burnt_vault_looks_never_created() {
    let mut ledger = ledger_with_member();
    ledger.burn_vault(&alice(), 0).unwrap();

    assert_eq!(
        ledger.events(),
        &[VaultEvent::VaultBurnt {
            vault_id: 0,
            owner: alice()
        }]
    );

    assert_eq!(ledger.owner_of(0).unwrap(), None);
    assert_eq!(ledger.get_metadata(0).unwrap(), None);
    assert!(!ledger.authorize_owner(0, &alice()).unwrap());
    assert!(!ledger.authorize_member(0, &bob()).unwrap());
    assert!(ledger.vault(0).unwrap().is_none());

    // Same answers as an id that never existed.
    assert_eq!(ledger.owner_of(0).unwrap(), ledger.owner_of(42).unwrap());

    assert_eq!(ledger.burn_vault(&alice(), 0), Err(VaultError::AccessDenied));
    assert_eq!(
        ledger.update_metadata(&alice(), 0, CID),
        Err(VaultError::AccessDenied)
    );
    assert_eq!(
        ledger.nominate_member(&alice(), 0, &bob()),
        Err(VaultError::AccessDenied)
    );
}

#[test]
fn burnt_ids_are_never_reused() {
    let mut ledger = VaultLedger::new();
    let first = ledger.create_vault(&alice(), CID).unwrap();
    ledger.burn_vault(&alice(), first).unwrap();
    let second = ledger.create_vault(&alice(), CID).unwrap();
    assert_eq!(second, first + 1);
    assert_eq!(ledger.vault_count().unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Persistent Store
// ---------------------------------------------------------------------------

#[test]
fn ledger_runs_on_sled() {
    let mut ledger = VaultLedger::with_store(ArcaDb::open_temporary().unwrap());
    let id = ledger.create_vault(&alice(), CID).unwrap();
    ledger.nominate_member(&alice(), id, &bob()).unwrap();
    ledger.update_metadata(&bob(), id, CID_2).unwrap();

    assert_eq!(
        ledger.update_metadata(&carol(), id, CID),
        Err(VaultError::AccessDenied)
    );
    assert!(ledger.authorize_member(id, &bob()).unwrap());
    assert_eq!(ledger.get_metadata(id).unwrap().unwrap().as_str(), CID_2);
    assert_eq!(ledger.events().len(), 3);
}

#[test]
fn ledger_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut ledger = VaultLedger::with_store(ArcaDb::open(dir.path()).unwrap());
        ledger.create_vault(&alice(), CID).unwrap();
        ledger.create_vault(&bob(), CID).unwrap();
        ledger.nominate_member(&alice(), 0, &carol()).unwrap();
        ledger.burn_vault(&bob(), 1).unwrap();
        ledger.store().flush().unwrap();
    }

    let mut ledger = VaultLedger::with_store(ArcaDb::open(dir.path()).unwrap());
    assert!(ledger.events().is_empty());
    assert_eq!(ledger.owner_of(0).unwrap(), Some(alice()));
    assert!(ledger.authorize_member(0, &carol()).unwrap());
    assert_eq!(ledger.owner_of(1).unwrap(), None);
    assert_eq!(ledger.create_vault(&carol(), CID).unwrap(), 2);
    assert_eq!(ledger.store().vault_count().unwrap(), 2);
}
