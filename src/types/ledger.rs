//! Ledger entry types for the wallet ledger
//!
//! This module defines the immutable record written for every balance-affecting
//! operation, together with its type and lifecycle status.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger entry identifier
pub type EntryId = u64;

/// Longest memo the ledger stores, in characters
pub const MAX_MEMO_CHARS: usize = 500;

/// Memo written on every top-up entry
pub const TOP_UP_MEMO: &str = "Top up";

/// Kind of balance-affecting operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// External credit into one account; no source
    TopUp,

    /// Movement between two distinct accounts
    Transfer,
}

/// Lifecycle status of a ledger entry
///
/// Entries start `Pending` and move to exactly one terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Written, balances not yet moved
    Pending,

    /// Balances moved and committed
    Success,

    /// Terminal failure
    Failed,
}

impl EntryStatus {
    /// Whether `self -> next` is a legal transition
    ///
    /// Only `Pending` may move, and only to a terminal status.
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Pending, EntryStatus::Success)
                | (EntryStatus::Pending, EntryStatus::Failed)
        )
    }
}

/// Immutable record of one top-up or transfer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// The entry identifier, assigned by the store
    pub id: EntryId,

    /// Operation kind
    #[serde(rename = "type")]
    pub entry_type: EntryType,

    /// Debited account (absent for top-ups)
    #[serde(rename = "sender_wallet_id")]
    pub source: Option<AccountId>,

    /// Credited account
    #[serde(rename = "receiver_wallet_id")]
    pub destination: AccountId,

    /// Moved amount, strictly positive with two fractional digits
    pub amount: Decimal,

    /// Lifecycle status
    pub status: EntryStatus,

    /// Free-form description
    #[serde(rename = "description")]
    pub memo: String,

    /// Client-supplied retry key, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// When the entry was appended
    pub created_at: DateTime<Utc>,

    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether `account` is the source or the destination of this entry
    pub fn involves(&self, account: AccountId) -> bool {
        self.destination == account || self.source == Some(account)
    }
}

/// Entry contents supplied by the engine before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub entry_type: EntryType,
    pub source: Option<AccountId>,
    pub destination: AccountId,
    pub amount: Decimal,
    pub memo: String,
    pub idempotency_key: Option<String>,
}

impl NewLedgerEntry {
    /// Top-up entry crediting `destination`
    pub fn top_up(
        destination: AccountId,
        amount: Decimal,
        idempotency_key: Option<String>,
    ) -> Self {
        NewLedgerEntry {
            entry_type: EntryType::TopUp,
            source: None,
            destination,
            amount,
            memo: TOP_UP_MEMO.to_string(),
            idempotency_key,
        }
    }

    /// Transfer entry from `source` to `destination`
    pub fn transfer(
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        memo: String,
        idempotency_key: Option<String>,
    ) -> Self {
        NewLedgerEntry {
            entry_type: EntryType::Transfer,
            source: Some(source),
            destination,
            amount,
            memo,
            idempotency_key,
        }
    }

    /// Materialize the entry as `Pending` with the store-assigned id
    pub fn into_pending(self, id: EntryId, now: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            entry_type: self.entry_type,
            source: self.source,
            destination: self.destination,
            amount: self.amount,
            status: EntryStatus::Pending,
            memo: self.memo,
            idempotency_key: self.idempotency_key,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::to_success(EntryStatus::Pending, EntryStatus::Success, true)]
    #[case::to_failed(EntryStatus::Pending, EntryStatus::Failed, true)]
    #[case::stay_pending(EntryStatus::Pending, EntryStatus::Pending, false)]
    #[case::success_back(EntryStatus::Success, EntryStatus::Pending, false)]
    #[case::success_to_failed(EntryStatus::Success, EntryStatus::Failed, false)]
    #[case::failed_to_success(EntryStatus::Failed, EntryStatus::Success, false)]
    fn test_status_transitions(
        #[case] from: EntryStatus,
        #[case] to: EntryStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_top_up_entry_has_no_source() {
        let entry =
            NewLedgerEntry::top_up(4, Decimal::new(5000, 2), None).into_pending(1, Utc::now());

        assert_eq!(entry.entry_type, EntryType::TopUp);
        assert_eq!(entry.source, None);
        assert_eq!(entry.memo, "Top up");
        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(entry.involves(4));
        assert!(!entry.involves(5));
    }

    #[test]
    fn test_entry_serializes_wire_names() {
        let entry = NewLedgerEntry::transfer(1, 2, Decimal::new(3000, 2), "rent".to_string(), None)
            .into_pending(9, Utc::now());

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "TRANSFER");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["sender_wallet_id"], 1);
        assert_eq!(json["receiver_wallet_id"], 2);
        assert_eq!(json["amount"], "30.00");
        assert_eq!(json["description"], "rent");
        assert!(json.get("idempotency_key").is_none());
    }
}
