//! Balance-mutation orchestration
//!
//! This module provides the `TransferEngine` struct, which runs every top-up
//! and transfer as one unit of work against the backend's stores.
//!
//! # Design
//!
//! Each operation follows the same protocol:
//!
//! 1. Open a unit
//! 2. Lease the involved accounts, in ascending account id order
//! 3. Replay a recorded outcome if the idempotency key was seen before
//! 4. Validate
//! 5. Append a `PENDING` entry
//! 6. Move the balances and save them
//! 7. Mark the entry `SUCCESS`
//! 8. Commit
//!
//! Any error rolls the unit back, so a rejected or aborted operation leaves
//! no trace in the stores. The rejection itself is reported as a `warn` event.
//!
//! # Architecture
//!
//! ```text
//! TransferEngine<B: Backend>
//!     ├── Arc<B::Units>           (unit of work)
//!     ├── Arc<B::Accounts>        (balances and leases)
//!     ├── Arc<B::Ledger>          (entries and idempotency index)
//!     └── Arc<dyn UserDirectory>  (transfer destination lookup)
//! ```
//!
//! # Thread Safety
//!
//! The engine is cheap to clone and can be shared across tokio tasks. Two
//! operations on disjoint accounts never wait on each other.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use super::traits::{AccountStore, Backend, LedgerStore, UnitOfWorkFactory, UserDirectory};
use crate::types::ledger::MAX_MEMO_CHARS;
use crate::types::money;
use crate::types::{
    Account, EntryStatus, IdempotencyRecord, IdempotentOutcome, LedgerError, NewLedgerEntry,
    OwnerId, TopUpRequest, TopUpResult, TransferRequest, TransferResult,
};

/// Orchestrates top-ups and transfers
pub struct TransferEngine<B: Backend> {
    units: Arc<B::Units>,
    accounts: Arc<B::Accounts>,
    ledger: Arc<B::Ledger>,
    directory: Arc<dyn UserDirectory>,
}

impl<B: Backend> Clone for TransferEngine<B> {
    fn clone(&self) -> Self {
        Self {
            units: Arc::clone(&self.units),
            accounts: Arc::clone(&self.accounts),
            ledger: Arc::clone(&self.ledger),
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<B: Backend> TransferEngine<B> {
    /// Create a new TransferEngine
    ///
    /// # Arguments
    ///
    /// * `units` - Factory for units of work
    /// * `accounts` - Account store sharing the units' state
    /// * `ledger` - Ledger store sharing the units' state
    /// * `directory` - Resolves transfer destinations
    pub fn new(
        units: Arc<B::Units>,
        accounts: Arc<B::Accounts>,
        ledger: Arc<B::Ledger>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            units,
            accounts,
            ledger,
            directory,
        }
    }

    /// Credit the owner's wallet
    ///
    /// # Arguments
    ///
    /// * `owner` - Authenticated user whose wallet is credited
    /// * `request` - Amount and optional idempotency key
    ///
    /// # Returns
    ///
    /// The wallet id, its new balance and the ledger entry id. A retry with a
    /// known idempotency key returns the original result and writes nothing.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - amount rounds to zero or less
    /// * `AccountNotFound` - the owner has no wallet
    /// * `BalanceOverflow` - the new balance would not fit
    /// * `Conflict` - lease timeout, or the key was used for a transfer
    #[instrument(skip_all, fields(user = owner))]
    pub async fn top_up(
        &self,
        owner: OwnerId,
        request: TopUpRequest,
    ) -> Result<TopUpResult, LedgerError> {
        let amount = match money::normalize_amount(request.amount) {
            Ok(amount) => amount,
            Err(e) => {
                reject("top_up", owner, &e);
                return Err(e);
            }
        };

        let mut unit = self.begin("top_up", owner).await?;
        let outcome = self
            .top_up_in(&mut unit, owner, amount, request.idempotency_key)
            .await;
        let result = self.finish(unit, outcome, "top_up", owner).await?;

        info!(
            wallet = result.wallet_id,
            transaction = result.transaction_id,
            amount = %amount,
            new_balance = %result.new_balance,
            "top-up committed"
        );
        Ok(result)
    }

    /// Move money from the owner's wallet to the destination user's wallet
    ///
    /// # Arguments
    ///
    /// * `sender` - Authenticated user whose wallet is debited
    /// * `request` - Destination email or user id, amount, memo and idempotency key
    ///
    /// # Returns
    ///
    /// The entry id, both wallet ids, the amount and the sender's new balance.
    ///
    /// # Errors
    ///
    /// * `UserNotFound` - the destination does not resolve to a user
    /// * `AccountNotFound` - sender or receiver has no wallet
    /// * `InvalidAmount` - amount rounds to zero or less
    /// * `SelfTransfer` - sender and receiver share a wallet
    /// * `InsufficientBalance` - the sender cannot cover the amount
    /// * `InvalidMemo` - memo longer than 500 characters
    /// * `BalanceOverflow` - the receiver's balance would not fit
    /// * `Conflict` - lease timeout, or the key was used for a top-up
    #[instrument(skip_all, fields(user = sender))]
    pub async fn transfer(
        &self,
        sender: OwnerId,
        request: TransferRequest,
    ) -> Result<TransferResult, LedgerError> {
        let receiver = match self.directory.resolve(&request.destination).await {
            Ok(Some(receiver)) => receiver,
            Ok(None) => {
                let e = LedgerError::user_not_found(&request.destination);
                reject("transfer", sender, &e);
                return Err(e);
            }
            Err(e) => {
                reject("transfer", sender, &e);
                return Err(e);
            }
        };

        let mut unit = self.begin("transfer", sender).await?;
        let outcome = self.transfer_in(&mut unit, sender, receiver, request).await;
        let result = self.finish(unit, outcome, "transfer", sender).await?;

        info!(
            transaction = result.transaction_id,
            from = result.sender_wallet_id,
            to = result.receiver_wallet_id,
            amount = %result.amount,
            "transfer committed"
        );
        Ok(result)
    }

    async fn top_up_in(
        &self,
        unit: &mut B::Unit,
        owner: OwnerId,
        amount: Decimal,
        key: Option<String>,
    ) -> Result<TopUpResult, LedgerError> {
        let account = self.accounts.get_for_update(unit, owner).await?;

        if let Some(key) = key.as_deref() {
            match self.replay(unit, owner, key).await? {
                Some(IdempotentOutcome::TopUp(original)) => return Ok(original),
                Some(other) => return Err(key_reused(key, other.kind())),
                None => {}
            }
        }

        let entry = self
            .ledger
            .append(
                unit,
                NewLedgerEntry::top_up(account.id, amount, key.clone()),
            )
            .await?;

        let balance = money::checked_credit(account.id, account.balance, amount)?;
        let credited = Account { balance, ..account };
        let saved = self.accounts.save(unit, &credited).await?;
        let entry = self
            .ledger
            .mark_status(unit, entry.id, EntryStatus::Success)
            .await?;

        let result = TopUpResult {
            wallet_id: saved.id,
            new_balance: saved.balance,
            transaction_id: entry.id,
            created_at: entry.created_at,
        };
        if let Some(key) = key {
            self.ledger
                .record_outcome(
                    unit,
                    IdempotencyRecord {
                        owner,
                        key,
                        entry_id: entry.id,
                        outcome: IdempotentOutcome::TopUp(result.clone()),
                    },
                )
                .await?;
        }
        Ok(result)
    }

    async fn transfer_in(
        &self,
        unit: &mut B::Unit,
        sender: OwnerId,
        receiver: OwnerId,
        request: TransferRequest,
    ) -> Result<TransferResult, LedgerError> {
        // Account ids never change, so committed reads are enough to fix the lock order.
        let sender_wallet = self.accounts.get(sender).await?.id;
        let receiver_wallet = self.accounts.get(receiver).await?.id;

        let mut order = [(sender_wallet, sender), (receiver_wallet, receiver)];
        order.sort_by_key(|(wallet, _)| *wallet);
        for (_, owner) in order {
            self.accounts.get_for_update(unit, owner).await?;
        }
        let source = self.accounts.get_for_update(unit, sender).await?;
        let target = self.accounts.get_for_update(unit, receiver).await?;

        let key = request.idempotency_key;
        if let Some(key) = key.as_deref() {
            match self.replay(unit, sender, key).await? {
                Some(IdempotentOutcome::Transfer(original)) => return Ok(original),
                Some(other) => return Err(key_reused(key, other.kind())),
                None => {}
            }
        }

        let amount = money::normalize_amount(request.amount)?;
        if source.id == target.id {
            return Err(LedgerError::self_transfer(source.id));
        }
        let debited = money::checked_debit(source.id, source.balance, amount)?;
        let memo = request.memo.unwrap_or_default();
        let memo_len = memo.chars().count();
        if memo_len > MAX_MEMO_CHARS {
            return Err(LedgerError::invalid_memo(memo_len, MAX_MEMO_CHARS));
        }
        let credited = money::checked_credit(target.id, target.balance, amount)?;

        let entry = self
            .ledger
            .append(
                unit,
                NewLedgerEntry::transfer(source.id, target.id, amount, memo, key.clone()),
            )
            .await?;

        let source = self
            .accounts
            .save(
                unit,
                &Account {
                    balance: debited,
                    ..source
                },
            )
            .await?;
        self.accounts
            .save(
                unit,
                &Account {
                    balance: credited,
                    ..target
                },
            )
            .await?;
        let entry = self
            .ledger
            .mark_status(unit, entry.id, EntryStatus::Success)
            .await?;

        let result = TransferResult {
            transaction_id: entry.id,
            sender_wallet_id: source.id,
            receiver_wallet_id: entry.destination,
            amount,
            new_balance: source.balance,
            status: entry.status,
            created_at: entry.created_at,
        };
        if let Some(key) = key {
            self.ledger
                .record_outcome(
                    unit,
                    IdempotencyRecord {
                        owner: sender,
                        key,
                        entry_id: entry.id,
                        outcome: IdempotentOutcome::Transfer(result.clone()),
                    },
                )
                .await?;
        }
        Ok(result)
    }

    /// Recorded outcome for `(owner, key)`
    ///
    /// Called with the owner's wallet leased, so a concurrent retry of the
    /// same key waits for the first attempt to commit or roll back.
    async fn replay(
        &self,
        unit: &mut B::Unit,
        owner: OwnerId,
        key: &str,
    ) -> Result<Option<IdempotentOutcome>, LedgerError> {
        let record = self.ledger.find_outcome(unit, owner, key).await?;
        if let Some(record) = &record {
            info!(
                user = owner,
                key,
                transaction = record.entry_id,
                "idempotent replay"
            );
        }
        Ok(record.map(|record| record.outcome))
    }

    async fn begin(&self, operation: &'static str, user: OwnerId) -> Result<B::Unit, LedgerError> {
        self.units
            .begin()
            .await
            .inspect_err(|e| reject(operation, user, e))
    }

    /// Commit on success, roll back and report on failure
    async fn finish<T>(
        &self,
        unit: B::Unit,
        outcome: Result<T, LedgerError>,
        operation: &'static str,
        user: OwnerId,
    ) -> Result<T, LedgerError> {
        match outcome {
            Ok(value) => match self.units.commit(unit).await {
                Ok(()) => Ok(value),
                Err(e) => {
                    reject(operation, user, &e);
                    Err(e)
                }
            },
            Err(e) => {
                self.units.rollback(unit);
                reject(operation, user, &e);
                Err(e)
            }
        }
    }
}

/// Audit event for an operation that wrote nothing
fn reject(operation: &'static str, user: OwnerId, error: &LedgerError) {
    if error.is_rejection() {
        warn!(
            operation,
            user,
            code = error.code(),
            status = error.status(),
            error = %error,
            "operation rejected"
        );
    } else {
        error!(
            operation,
            user,
            code = error.code(),
            status = error.status(),
            error = %error,
            "operation failed"
        );
    }
}

fn key_reused(key: &str, kind: &str) -> LedgerError {
    LedgerError::conflict(format!(
        "idempotency key {:?} was already used for a {}",
        key, kind
    ))
}
