//! # Vault Host
//!
//! The layer between the API and the ledger. A signed call goes through:
//!
//! 1. signature check (no lock held),
//! 2. nonce check and advance,
//! 3. ledger execution,
//! 4. event fan-out to subscribers.
//!
//! Steps 2 to 4 run under one lock, so calls are applied and their events
//! published in a single global order.
//!
//! The nonce advances for every call that passes the signature check, even
//! if the ledger then rejects it. A rejected call cannot be replayed to
//! succeed later.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use arca_contracts::call::{CallError, SignedCall, VaultCall};
use arca_contracts::vault_ledger::{VaultError, VaultEvent, VaultLedger};
use arca_protocol::crypto::AccountId;
use arca_protocol::storage::{ArcaDb, StoreError, StoreResult};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Errors & Receipts
// ---------------------------------------------------------------------------

/// Why a signed call never reached the ledger (or the store failed under it).
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error("stale nonce {got}: last accepted is {last}")]
    StaleNonce { got: u64, last: u64 },

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Outcome of a call the ledger evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Receipt {
    Applied { events: Vec<VaultEvent> },
    Rejected { error: String, message: String },
}

// ---------------------------------------------------------------------------
// VaultHost
// ---------------------------------------------------------------------------

pub struct VaultHost {
    ledger: Mutex<VaultLedger<ArcaDb>>,
    /// Same sled instance as the ledger's store; used for nonces.
    db: ArcaDb,
    events: broadcast::Sender<VaultEvent>,
    metrics: SharedMetrics,
}

impl VaultHost {
    pub fn new(
        db: ArcaDb,
        events: broadcast::Sender<VaultEvent>,
        metrics: SharedMetrics,
    ) -> StoreResult<Self> {
        let ledger = VaultLedger::with_store(db.clone());
        metrics.live_vaults.set(gauge_value(ledger.vault_count()?));
        Ok(Self {
            ledger: Mutex::new(ledger),
            db,
            events,
            metrics,
        })
    }

    /// New receiver for every event applied from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    /// Verify, sequence and execute a signed call.
    ///
    /// Ledger rejections come back as [`Receipt::Rejected`], not as errors.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Call`] for a bad signature, [`SubmitError::StaleNonce`]
    /// for a replayed or out-of-order nonce, [`SubmitError::Storage`] if sled
    /// fails.
    pub fn submit(&self, signed: &SignedCall) -> Result<Receipt, SubmitError> {
        let _timer = self.metrics.call_latency_seconds.start_timer();

        if let Err(err) = signed.verify() {
            warn!(caller = %signed.caller, nonce = signed.nonce, error = %err, "signature rejected");
            return Err(err.into());
        }

        let mut ledger = self.ledger.lock();

        if let Some(last) = self.db.get_nonce(&signed.caller)? {
            if signed.nonce <= last {
                debug!(caller = %signed.caller, got = signed.nonce, last, "stale nonce");
                return Err(SubmitError::StaleNonce {
                    got: signed.nonce,
                    last,
                });
            }
        }
        self.db.set_nonce(&signed.caller, signed.nonce)?;

        let outcome = ledger.execute(&signed.caller, &signed.call);
        let events = ledger.drain_events();
        self.persist();

        let receipt = match outcome {
            Ok(_) => {
                self.metrics.calls_applied_total.inc();
                self.metrics.events_emitted_total.inc_by(events.len() as u64);
                for event in &events {
                    debug!(
                        event = event.name(),
                        vault_id = event.vault_id(),
                        "publishing vault event"
                    );
                    // No subscribers is fine.
                    let _ = self.events.send(event.clone());
                }
                Receipt::Applied { events }
            }
            Err(VaultError::Storage(err)) => return Err(err.into()),
            Err(err) => {
                self.metrics.calls_rejected_total.inc();
                Receipt::Rejected {
                    error: err.kind().to_string(),
                    message: err.to_string(),
                }
            }
        };

        self.metrics
            .live_vaults
            .set(gauge_value(ledger.vault_count()?));
        Ok(receipt)
    }

    /// One flush per call, covering the nonce and any ledger write. The
    /// writes are already applied, so a failed flush is logged rather than
    /// reported: the receipt still describes what the ledger holds.
    fn persist(&self) {
        if let Err(err) = self.db.flush() {
            warn!(error = %err, "failed to flush ledger database");
        }
    }

    /// What `call` from `caller` would do right now, without doing it.
    pub fn probe(&self, caller: &AccountId, call: &VaultCall) -> Result<(), VaultError> {
        self.metrics.queries_total.inc();
        self.ledger.lock().probe(caller, call)
    }

    /// Run a read-only closure against the ledger, counted as one query.
    pub fn query<T>(
        &self,
        f: impl FnOnce(&VaultLedger<ArcaDb>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.metrics.queries_total.inc();
        let ledger = self.ledger.lock();
        f(&ledger)
    }

    /// Last accepted nonce of `account`.
    pub fn nonce(&self, account: &AccountId) -> StoreResult<Option<u64>> {
        self.metrics.queries_total.inc();
        self.db.get_nonce(account)
    }
}

fn gauge_value(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
