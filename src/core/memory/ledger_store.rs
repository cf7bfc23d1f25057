//! In-memory append-only ledger
//!
//! Entries and idempotency records are staged on the unit and published by
//! its commit. History reads see committed entries only.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::database::{MemoryDatabase, MemoryUnit};
use crate::core::traits::LedgerStore;
use crate::types::{
    AccountId, EntryId, EntryStatus, IdempotencyRecord, LedgerEntry, LedgerError, NewLedgerEntry,
    OwnerId,
};

/// Ledger store over a shared [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryLedgerStore {
    db: Arc<MemoryDatabase>,
}

impl MemoryLedgerStore {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore<MemoryUnit> for MemoryLedgerStore {
    async fn append(
        &self,
        unit: &mut MemoryUnit,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        let entry = entry.into_pending(self.db.allocate_entry_id(), Utc::now());
        unit.entries.insert(entry.id, entry.clone());
        debug!(unit = unit.id, entry = entry.id, "entry appended");
        Ok(entry)
    }

    async fn mark_status(
        &self,
        unit: &mut MemoryUnit,
        id: EntryId,
        status: EntryStatus,
    ) -> Result<LedgerEntry, LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        let unit_id = unit.id;
        let entry = unit.entries.get_mut(&id).ok_or_else(|| {
            LedgerError::internal(format!("entry {} is not staged on unit {}", id, unit_id))
        })?;

        if !entry.status.can_transition_to(status) {
            return Err(LedgerError::internal(format!(
                "entry {} cannot move from {:?} to {:?}",
                id, entry.status, status
            )));
        }

        entry.status = status;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn list_by_account(
        &self,
        account: AccountId,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<LedgerEntry>, u64), LedgerError> {
        let _gate = self.db.commit_gate.read().await;

        let ids = self
            .db
            .entries_by_account
            .get(&account)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();

        let mut entries: Vec<LedgerEntry> = ids
            .iter()
            .filter_map(|id| self.db.entries.get(id).map(|entry| entry.value().clone()))
            .filter(|entry| entry.involves(account))
            .collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = entries.len() as u64;
        let page = entries
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn find_outcome(
        &self,
        unit: &mut MemoryUnit,
        owner: OwnerId,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        if let Some(staged) = unit
            .outcomes
            .iter()
            .find(|record| record.owner == owner && record.key == key)
        {
            return Ok(Some(staged.clone()));
        }

        Ok(self
            .db
            .idempotency
            .get(&(owner, key.to_string()))
            .map(|record| record.value().clone()))
    }

    async fn record_outcome(
        &self,
        unit: &mut MemoryUnit,
        record: IdempotencyRecord,
    ) -> Result<(), LedgerError> {
        unit.ensure_owned_by(&self.db)?;

        if unit
            .outcomes
            .iter()
            .any(|staged| staged.owner == record.owner && staged.key == record.key)
        {
            return Err(LedgerError::conflict(format!(
                "idempotency key {:?} recorded twice in one unit",
                record.key
            )));
        }
        unit.outcomes.push(record);
        Ok(())
    }
}
