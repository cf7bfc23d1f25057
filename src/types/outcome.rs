//! Requests and results exchanged with the ledger service
//!
//! Results serialize with snake_case field names. Amounts serialize as
//! decimal strings with two fractional digits and timestamps as RFC 3339 UTC.

use super::account::{AccountId, OwnerId};
use super::ledger::{EntryId, EntryStatus, LedgerEntry};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Credit request for the caller's own wallet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopUpRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Transfer request from the caller's wallet
///
/// `destination` is the receiver's email or numeric user id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferRequest {
    pub destination: String,
    pub amount: Decimal,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Result of a committed top-up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopUpResult {
    pub wallet_id: AccountId,
    pub new_balance: Decimal,
    pub transaction_id: EntryId,
    pub created_at: DateTime<Utc>,
}

/// Result of a committed transfer
///
/// `new_balance` is the sender's balance after the debit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferResult {
    pub transaction_id: EntryId,
    pub sender_wallet_id: AccountId,
    pub receiver_wallet_id: AccountId,
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

/// Page position and totals for a history read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// One page of an account's ledger entries, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryResult {
    pub entries: Vec<LedgerEntry>,
    pub pagination: PaginationMeta,
}

/// Committed balance of one wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceView {
    pub wallet_id: AccountId,
    pub user_id: OwnerId,
    pub balance: Decimal,
}

/// Original result stored against an idempotency key
#[derive(Debug, Clone, PartialEq)]
pub enum IdempotentOutcome {
    TopUp(TopUpResult),
    Transfer(TransferResult),
}

impl IdempotentOutcome {
    /// Operation kind name, used when a key is reused across kinds
    pub fn kind(&self) -> &'static str {
        match self {
            IdempotentOutcome::TopUp(_) => "top-up",
            IdempotentOutcome::Transfer(_) => "transfer",
        }
    }
}

/// Unique `(owner, key)` index row
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub owner: OwnerId,
    pub key: String,
    pub entry_id: EntryId,
    pub outcome: IdempotentOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_result_wire_format() {
        let created_at = DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = TransferResult {
            transaction_id: 12,
            sender_wallet_id: 1,
            receiver_wallet_id: 2,
            amount: Decimal::new(3000, 2),
            new_balance: Decimal::new(12000, 2),
            status: EntryStatus::Success,
            created_at,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["amount"], "30.00");
        assert_eq!(json["new_balance"], "120.00");
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["created_at"], "2025-01-02T03:04:05Z");
    }

    #[test]
    fn test_transfer_request_optional_fields() {
        let request: TransferRequest =
            serde_json::from_str(r#"{"destination":"bob@example.com","amount":"30"}"#).unwrap();

        assert_eq!(request.destination, "bob@example.com");
        assert_eq!(request.amount, Decimal::new(30, 0));
        assert_eq!(request.memo, None);
        assert_eq!(request.idempotency_key, None);
    }
}
