//! Shared in-memory state and the unit of work that writes to it
//!
//! # Design
//!
//! Committed state lives in `DashMap`s inside [`MemoryDatabase`]. A
//! [`MemoryUnit`] stages its writes privately and holds an owned
//! `tokio::sync::Mutex` guard per locked account (its lease). Commit takes
//! the write side of a single commit gate, checks the staged writes, and
//! publishes them; unlocked readers take the read side, so they see either
//! none or all of a unit's writes.
//!
//! Leases are released when the unit is dropped, after its writes have been
//! published. Dropping a unit without committing is a rollback.
//!
//! No `DashMap` reference is ever held across an `.await`.

use std::collections::BTreeMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

use crate::core::traits::UnitOfWorkFactory;
use crate::types::{
    Account, AccountId, EntryId, EntryStatus, IdempotencyRecord, LedgerEntry, LedgerError,
    OwnerId,
};

/// Committed state of the in-memory ledger
#[derive(Debug)]
pub struct MemoryDatabase {
    pub(super) accounts: DashMap<AccountId, Account>,
    pub(super) owners: DashMap<OwnerId, AccountId>,
    leases: DashMap<AccountId, Arc<Mutex<()>>>,
    pub(super) entries: DashMap<EntryId, LedgerEntry>,
    pub(super) entries_by_account: DashMap<AccountId, Vec<EntryId>>,
    pub(super) idempotency: DashMap<(OwnerId, String), IdempotencyRecord>,
    pub(super) commit_gate: RwLock<()>,
    next_account_id: AtomicU64,
    next_entry_id: AtomicU64,
    next_unit_id: AtomicU64,
    pub(super) lock_timeout: Duration,
}

impl MemoryDatabase {
    /// Create an empty database whose leases wait at most `lock_timeout`
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            accounts: DashMap::new(),
            owners: DashMap::new(),
            leases: DashMap::new(),
            entries: DashMap::new(),
            entries_by_account: DashMap::new(),
            idempotency: DashMap::new(),
            commit_gate: RwLock::new(()),
            next_account_id: AtomicU64::new(1),
            next_entry_id: AtomicU64::new(1),
            next_unit_id: AtomicU64::new(1),
            lock_timeout,
        }
    }

    pub(super) fn allocate_account_id(&self) -> AccountId {
        self.next_account_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn allocate_entry_id(&self) -> EntryId {
        self.next_entry_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Account id of `owner`, if the owner has an account
    pub(super) fn account_id_of(&self, owner: OwnerId) -> Option<AccountId> {
        self.owners.get(&owner).map(|id| *id.value())
    }

    /// Committed copy of an account
    pub(super) fn committed_account(&self, id: AccountId) -> Option<Account> {
        self.accounts
            .get(&id)
            .map(|account| account.value().clone())
    }

    /// Lease mutex of an account, created on first use
    pub(super) fn lease(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.leases
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Check that nothing staged on `unit` would break a store invariant
    fn validate(&self, unit: &MemoryUnit) -> Result<(), LedgerError> {
        if let Some(entry) = unit
            .entries
            .values()
            .find(|entry| entry.status == EntryStatus::Pending)
        {
            return Err(LedgerError::internal(format!(
                "entry {} is still pending at commit",
                entry.id
            )));
        }

        if let Some(account) = unit
            .accounts
            .keys()
            .find(|id| !unit.leases.contains_key(id))
        {
            return Err(LedgerError::internal(format!(
                "wallet {} staged without its lease",
                account
            )));
        }

        for record in &unit.outcomes {
            if self
                .idempotency
                .contains_key(&(record.owner, record.key.clone()))
            {
                return Err(LedgerError::conflict(format!(
                    "idempotency key {:?} already used by user {}",
                    record.key, record.owner
                )));
            }
        }

        Ok(())
    }

    /// Move every staged write of `unit` into committed state
    fn publish(&self, unit: &mut MemoryUnit) {
        for (id, account) in mem::take(&mut unit.accounts) {
            self.accounts.insert(id, account);
        }

        for (id, entry) in mem::take(&mut unit.entries) {
            self.entries_by_account
                .entry(entry.destination)
                .or_default()
                .push(id);
            if let Some(source) = entry.source.filter(|source| *source != entry.destination) {
                self.entries_by_account.entry(source).or_default().push(id);
            }
            self.entries.insert(id, entry);
        }

        for record in mem::take(&mut unit.outcomes) {
            self.idempotency
                .insert((record.owner, record.key.clone()), record);
        }
    }
}

/// Unit of work over a [`MemoryDatabase`]
///
/// Holds the leases it acquired and every write it staged. Dropping the unit
/// releases the leases and discards anything not yet committed.
pub struct MemoryUnit {
    pub(super) id: u64,
    pub(super) db: Arc<MemoryDatabase>,
    pub(super) leases: BTreeMap<AccountId, OwnedMutexGuard<()>>,
    pub(super) accounts: BTreeMap<AccountId, Account>,
    pub(super) entries: BTreeMap<EntryId, LedgerEntry>,
    pub(super) outcomes: Vec<IdempotencyRecord>,
    completed: bool,
}

impl MemoryUnit {
    /// Accounts currently leased by this unit, ascending
    #[cfg(test)]
    pub(super) fn leased_accounts(&self) -> Vec<AccountId> {
        self.leases.keys().copied().collect()
    }

    /// Fail unless `db` is the database this unit was opened on
    pub(super) fn ensure_owned_by(&self, db: &Arc<MemoryDatabase>) -> Result<(), LedgerError> {
        if Arc::ptr_eq(&self.db, db) {
            Ok(())
        } else {
            Err(LedgerError::internal(format!(
                "unit {} belongs to another store",
                self.id
            )))
        }
    }
}

impl std::fmt::Debug for MemoryUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryUnit")
            .field("id", &self.id)
            .field("leases", &self.leases.keys().collect::<Vec<_>>())
            .field("staged_accounts", &self.accounts.len())
            .field("staged_entries", &self.entries.len())
            .field("completed", &self.completed)
            .finish()
    }
}

impl Drop for MemoryUnit {
    fn drop(&mut self) {
        if !self.completed {
            debug!(
                unit = self.id,
                leases = self.leases.len(),
                staged_entries = self.entries.len(),
                "unit dropped without commit, staged writes discarded"
            );
        }
    }
}

/// Opens units of work on a shared [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryUnits {
    db: Arc<MemoryDatabase>,
}

impl MemoryUnits {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryUnits {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<MemoryUnit, LedgerError> {
        let id = self.db.next_unit_id.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryUnit {
            id,
            db: Arc::clone(&self.db),
            leases: BTreeMap::new(),
            accounts: BTreeMap::new(),
            entries: BTreeMap::new(),
            outcomes: Vec::new(),
            completed: false,
        })
    }

    async fn commit(&self, mut unit: MemoryUnit) -> Result<(), LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        let gate = self.db.commit_gate.write().await;
        if let Err(e) = self.db.validate(&unit) {
            warn!(unit = unit.id, error = %e, "commit refused");
            return Err(e);
        }
        self.db.publish(&mut unit);
        unit.completed = true;
        drop(gate);

        debug!(unit = unit.id, "unit committed");
        Ok(())
    }

    fn rollback(&self, mut unit: MemoryUnit) {
        debug!(
            unit = unit.id,
            staged_entries = unit.entries.len(),
            "unit rolled back"
        );
        unit.completed = true;
    }
}
