//! Core traits for account storage, ledger storage and the unit of work
//!
//! This module defines the trait abstractions the engine is written against.
//! A backend bundles one implementation of each so the engine never names a
//! concrete store.
//!
//! # Unit of work
//!
//! Every write happens inside a unit obtained from [`UnitOfWorkFactory::begin`].
//! Writes are staged on the unit and become visible to other readers only
//! when the unit is committed. Dropping a unit without committing discards
//! its staged writes and releases every lease it holds.

use crate::types::{
    Account, AccountId, EntryId, EntryStatus, IdempotencyRecord, LedgerEntry, LedgerError,
    NewLedgerEntry, OwnerId, User,
};
use async_trait::async_trait;

/// Opens, commits and rolls back units of work
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// Unit type handed to the stores
    type Unit: Send + 'static;

    /// Open a new unit
    async fn begin(&self) -> Result<Self::Unit, LedgerError>;

    /// Publish every staged write of `unit` atomically, then release its leases
    ///
    /// # Errors
    ///
    /// * `Internal` if a staged entry is still `PENDING`
    /// * `Conflict` if a staged idempotency key was committed by someone else
    ///
    /// On error nothing is published.
    async fn commit(&self, unit: Self::Unit) -> Result<(), LedgerError>;

    /// Discard every staged write of `unit` and release its leases
    fn rollback(&self, unit: Self::Unit);
}

/// Trait for account balance records
///
/// One account per owner. Balances change only through [`AccountStore::save`]
/// inside a unit that holds the account's lease.
#[async_trait]
pub trait AccountStore<U: Send + 'static>: Send + Sync {
    /// Committed state of the owner's account, without locking
    async fn get(&self, owner: OwnerId) -> Result<Account, LedgerError>;

    /// Lock the owner's account for the lifetime of `unit` and return its state
    ///
    /// Re-entrant within one unit. Waits at most the configured lock timeout.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` if the owner has no account
    /// * `Conflict` if the lease could not be acquired in time
    async fn get_for_update(&self, unit: &mut U, owner: OwnerId) -> Result<Account, LedgerError>;

    /// Stage a new balance for an account locked by `unit`
    ///
    /// Returns the staged record with its version bumped.
    ///
    /// # Errors
    ///
    /// * `Conflict` if `account.version` is stale
    /// * `Internal` if `unit` does not hold the account's lease
    async fn save(&self, unit: &mut U, account: &Account) -> Result<Account, LedgerError>;

    /// Open a zero-balance account for `owner`
    ///
    /// # Errors
    ///
    /// * `AlreadyExists` if the owner already has one
    async fn create(&self, owner: OwnerId) -> Result<Account, LedgerError>;

    /// Committed snapshot of every account, ordered by id
    async fn list(&self) -> Result<Vec<Account>, LedgerError>;
}

/// Trait for the append-only ledger
///
/// Entries are never deleted. Their status moves once, from `PENDING` to a
/// terminal status, and only inside the unit that appended them.
#[async_trait]
pub trait LedgerStore<U: Send + 'static>: Send + Sync {
    /// Stage a `PENDING` entry and return it with its assigned id and timestamps
    async fn append(&self, unit: &mut U, entry: NewLedgerEntry)
        -> Result<LedgerEntry, LedgerError>;

    /// Move a staged entry to a terminal status
    async fn mark_status(
        &self,
        unit: &mut U,
        id: EntryId,
        status: EntryStatus,
    ) -> Result<LedgerEntry, LedgerError>;

    /// Committed entries where `account` is source or destination
    ///
    /// Entries are ordered newest first (ties broken by id, descending).
    /// Returns the requested page and the total number of matching entries.
    async fn list_by_account(
        &self,
        account: AccountId,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<LedgerEntry>, u64), LedgerError>;

    /// Outcome previously recorded for `(owner, key)`, staged or committed
    async fn find_outcome(
        &self,
        unit: &mut U,
        owner: OwnerId,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, LedgerError>;

    /// Stage an idempotency record, published on commit
    async fn record_outcome(&self, unit: &mut U, record: IdempotencyRecord)
        -> Result<(), LedgerError>;
}

/// Trait for the user identity collaborator
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve an email or a numeric user id to a user id
    async fn resolve(&self, identifier: &str) -> Result<Option<OwnerId>, LedgerError>;

    /// Register a new user
    ///
    /// # Errors
    ///
    /// * `AlreadyExists` if the email is taken
    async fn register(&self, email: &str, name: &str) -> Result<User, LedgerError>;

    /// Remove a user whose registration could not be completed
    ///
    /// Unknown ids are ignored.
    async fn unregister(&self, id: OwnerId) -> Result<(), LedgerError>;
}

/// Bundle of store implementations sharing one unit type
pub trait Backend: Send + Sync + 'static {
    type Unit: Send + 'static;
    type Units: UnitOfWorkFactory<Unit = Self::Unit> + 'static;
    type Accounts: AccountStore<Self::Unit> + 'static;
    type Ledger: LedgerStore<Self::Unit> + 'static;
}
