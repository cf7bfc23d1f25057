//! In-memory account store with per-account leases
//!
//! This module provides [`MemoryAccountStore`], the `AccountStore` of the
//! in-memory backend.
//!
//! # Leases
//!
//! Each account has a `tokio::sync::Mutex<()>`. `get_for_update` acquires it
//! as an owned guard and parks the guard on the unit, so the lease lives
//! exactly as long as the unit. A second unit asking for the same account
//! waits up to the configured lock timeout and then gets `Conflict`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::database::{MemoryDatabase, MemoryUnit};
use crate::core::traits::AccountStore;
use crate::types::{Account, LedgerError, OwnerId};

/// Account store over a shared [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryAccountStore {
    db: Arc<MemoryDatabase>,
}

impl MemoryAccountStore {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore<MemoryUnit> for MemoryAccountStore {
    async fn get(&self, owner: OwnerId) -> Result<Account, LedgerError> {
        let _gate = self.db.commit_gate.read().await;
        self.db
            .account_id_of(owner)
            .and_then(|id| self.db.committed_account(id))
            .ok_or_else(|| LedgerError::account_not_found(owner))
    }

    async fn get_for_update(
        &self,
        unit: &mut MemoryUnit,
        owner: OwnerId,
    ) -> Result<Account, LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        let id = self
            .db
            .account_id_of(owner)
            .ok_or_else(|| LedgerError::account_not_found(owner))?;

        if !unit.leases.contains_key(&id) {
            let lease = self.db.lease(id);
            let wait = self.db.lock_timeout;
            let guard = match tokio::time::timeout(wait, lease.lock_owned()).await {
                Ok(guard) => guard,
                Err(_) => {
                    warn!(
                        unit = unit.id,
                        wallet = id,
                        timeout_ms = wait.as_millis() as u64,
                        "lease wait timed out"
                    );
                    return Err(LedgerError::conflict(format!(
                        "timed out waiting for the lease on wallet {}",
                        id
                    )));
                }
            };
            unit.leases.insert(id, guard);
            debug!(unit = unit.id, wallet = id, "lease acquired");
        }

        if let Some(staged) = unit.accounts.get(&id) {
            return Ok(staged.clone());
        }
        self.db
            .committed_account(id)
            .ok_or_else(|| LedgerError::account_not_found(owner))
    }

    async fn save(&self, unit: &mut MemoryUnit, account: &Account) -> Result<Account, LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        if !unit.leases.contains_key(&account.id) {
            return Err(LedgerError::internal(format!(
                "unit {} saved wallet {} without holding its lease",
                unit.id, account.id
            )));
        }

        let current = match unit.accounts.get(&account.id) {
            Some(staged) => staged.version,
            None => self
                .db
                .committed_account(account.id)
                .map(|committed| committed.version)
                .ok_or_else(|| LedgerError::account_not_found(account.owner))?,
        };
        if current != account.version {
            return Err(LedgerError::conflict(format!(
                "wallet {} is at version {}, save was based on version {}",
                account.id, current, account.version
            )));
        }

        let mut staged = account.clone();
        staged.version += 1;
        staged.updated_at = Utc::now();
        unit.accounts.insert(staged.id, staged.clone());
        Ok(staged)
    }

    async fn create(&self, owner: OwnerId) -> Result<Account, LedgerError> {
        let _gate = self.db.commit_gate.write().await;

        if self.db.owners.contains_key(&owner) {
            return Err(LedgerError::already_exists(format!(
                "Wallet for user {}",
                owner
            )));
        }

        let account = Account::new(self.db.allocate_account_id(), owner);
        self.db.accounts.insert(account.id, account.clone());
        self.db.owners.insert(owner, account.id);

        info!(wallet = account.id, user = owner, "wallet opened");
        Ok(account)
    }

    async fn list(&self) -> Result<Vec<Account>, LedgerError> {
        let _gate = self.db.commit_gate.read().await;
        let mut accounts: Vec<Account> = self
            .db
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }
}
