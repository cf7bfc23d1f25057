//! Error types for the wallet ledger
//!
//! This module defines every error the ledger can report. Each variant maps to
//! a stable machine-readable code and an HTTP-style status so a transport layer
//! can render it without inspecting the message.
//!
//! # Error Categories
//!
//! - **Business rules**: invalid amount, self transfer, insufficient balance, memo too long
//! - **Lookups**: wallet or user not found, duplicate account or user
//! - **Store failures**: lock contention, concurrent modification, internal faults
//! - **Replay I/O**: file not found, I/O and CSV parse errors

use super::account::{AccountId, OwnerId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger
///
/// Business-rule violations are always detected before any write is staged,
/// so returning one of them means nothing was persisted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is zero, negative, or does not fit a balance column
    #[error("Amount must be greater than zero (got {amount})")]
    InvalidAmount {
        /// The rejected amount as supplied
        amount: Decimal,
    },

    /// Source and destination resolve to the same wallet
    #[error("Cannot transfer to yourself (wallet {account})")]
    SelfTransfer {
        /// The wallet on both sides
        account: AccountId,
    },

    /// Debit would drive the source balance negative
    #[error(
        "Insufficient balance in wallet {account}: balance {balance}, requested {requested}"
    )]
    InsufficientBalance {
        /// Wallet being debited
        account: AccountId,
        /// Balance at the time of the check
        balance: Decimal,
        /// Requested debit
        requested: Decimal,
    },

    /// Credit would overflow the balance column
    #[error("Balance overflow in wallet {account}")]
    BalanceOverflow {
        /// Wallet being credited
        account: AccountId,
    },

    /// Memo longer than the ledger stores
    #[error("Memo is {length} characters, at most {max} are allowed")]
    InvalidMemo {
        /// Length of the rejected memo in characters
        length: usize,
        /// Maximum accepted length
        max: usize,
    },

    /// The owner has no wallet
    #[error("Wallet not found for user {owner}")]
    AccountNotFound {
        /// Owner that was looked up
        owner: OwnerId,
    },

    /// The destination identifier does not resolve to a user
    #[error("User not found: {identifier}")]
    UserNotFound {
        /// Email or id that failed to resolve
        identifier: String,
    },

    /// A unique record already exists
    #[error("{resource} already exists")]
    AlreadyExists {
        /// Description of the duplicated record
        resource: String,
    },

    /// Lock contention timeout or concurrent modification
    #[error("Concurrent modification detected, please retry: {reason}")]
    Conflict {
        /// What collided
        reason: String,
    },

    /// Store or invariant failure
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },

    /// Replay input file not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error while reading input or writing output
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl LedgerError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::SelfTransfer { .. } => "SELF_TRANSFER",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            LedgerError::InvalidMemo { .. } => "INVALID_MEMO",
            LedgerError::AccountNotFound { .. } => "WALLET_NOT_FOUND",
            LedgerError::UserNotFound { .. } => "USER_NOT_FOUND",
            LedgerError::AlreadyExists { .. } => "ALREADY_EXISTS",
            LedgerError::Conflict { .. } => "CONFLICT",
            LedgerError::Internal { .. } => "INTERNAL",
            LedgerError::FileNotFound { .. } => "FILE_NOT_FOUND",
            LedgerError::IoError { .. } => "IO_ERROR",
            LedgerError::ParseError { .. } => "PARSE_ERROR",
        }
    }

    /// HTTP-style status for this error kind
    pub fn status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount { .. }
            | LedgerError::SelfTransfer { .. }
            | LedgerError::InvalidMemo { .. }
            | LedgerError::ParseError { .. } => 400,
            LedgerError::AccountNotFound { .. }
            | LedgerError::UserNotFound { .. }
            | LedgerError::FileNotFound { .. } => 404,
            LedgerError::InsufficientBalance { .. }
            | LedgerError::AlreadyExists { .. }
            | LedgerError::Conflict { .. } => 409,
            LedgerError::BalanceOverflow { .. } => 422,
            LedgerError::Internal { .. } | LedgerError::IoError { .. } => 500,
        }
    }

    /// Whether the error is a business-rule rejection rather than a fault
    pub fn is_rejection(&self) -> bool {
        self.status() < 500
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    /// Create a SelfTransfer error
    pub fn self_transfer(account: AccountId) -> Self {
        LedgerError::SelfTransfer { account }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(account: AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account,
            balance,
            requested,
        }
    }

    /// Create a BalanceOverflow error
    pub fn balance_overflow(account: AccountId) -> Self {
        LedgerError::BalanceOverflow { account }
    }

    /// Create an InvalidMemo error
    pub fn invalid_memo(length: usize, max: usize) -> Self {
        LedgerError::InvalidMemo { length, max }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(owner: OwnerId) -> Self {
        LedgerError::AccountNotFound { owner }
    }

    /// Create a UserNotFound error
    pub fn user_not_found(identifier: &str) -> Self {
        LedgerError::UserNotFound {
            identifier: identifier.to_string(),
        }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(resource: impl Into<String>) -> Self {
        LedgerError::AlreadyExists {
            resource: resource.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        LedgerError::Conflict {
            reason: reason.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::Internal {
            message: message.into(),
        }
    }
}
