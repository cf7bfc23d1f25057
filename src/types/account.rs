//! Account-related types for the wallet ledger
//!
//! This module defines the Account structure and the identifiers used to
//! address accounts and their owners.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Account (wallet) identifier
pub type AccountId = u64;

/// Owner identifier, supplied by the identity collaborator
///
/// Each owner holds exactly one account.
pub type OwnerId = u64;

/// Single-owner balance record
///
/// Balances are fixed-point decimals with two fractional digits and never
/// go negative. The `version` is the lock token: every committed save
/// bumps it by one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The account identifier
    pub id: AccountId,

    /// The owner of this account (unique across accounts)
    pub owner: OwnerId,

    /// Current balance
    ///
    /// Only mutated inside a unit of work that holds this account's lease.
    pub balance: Decimal,

    /// Lock token, incremented on every save
    pub version: u64,

    /// When the account was opened
    pub created_at: DateTime<Utc>,

    /// When the balance last changed
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `id` - The account identifier assigned by the store
    /// * `owner` - The owner this account belongs to
    pub fn new(id: AccountId, owner: OwnerId) -> Self {
        let now = Utc::now();
        Account {
            id,
            owner,
            balance: Decimal::new(0, 2),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
