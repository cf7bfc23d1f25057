//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account records and identifiers
//! - `ledger`: Ledger entries, their kinds and statuses
//! - `money`: Fixed-point amount helpers
//! - `user`: Account owners
//! - `outcome`: Requests and results of ledger operations
//! - `operation`: Replayable operations
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod ledger;
pub mod money;
pub mod operation;
pub mod outcome;
pub mod user;

pub use account::{Account, AccountId, OwnerId};
pub use error::LedgerError;
pub use ledger::{EntryId, EntryStatus, EntryType, LedgerEntry, NewLedgerEntry};
pub use operation::{Operation, OperationOutcome};
pub use outcome::{
    BalanceView, HistoryResult, IdempotencyRecord, IdempotentOutcome, PaginationMeta,
    TopUpRequest, TopUpResult, TransferRequest, TransferResult,
};
pub use user::User;
