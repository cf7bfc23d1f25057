//! CSV format handling for replayed operations and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - OperationCsvRecord structure for deserialization
//! - Conversion from CSV records to operations
//! - Wallet output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input columns
//!
//! `op,user,counterparty,amount,memo,key`
//!
//! | op         | user      | counterparty         | amount | memo      | key        |
//! |------------|-----------|----------------------|--------|-----------|------------|
//! | `register` |           | email                |        | name      |            |
//! | `topup`    | user id   |                      | amount |           | optional   |
//! | `transfer` | user id   | receiver email or id | amount | optional  | optional   |

use crate::types::{Account, LedgerError, Operation, OwnerId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Every column but `op` is optional; which ones are required depends on the
/// operation.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct OperationCsvRecord {
    pub op: String,
    pub user: Option<OwnerId>,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub memo: Option<String>,
    pub key: Option<String>,
}

/// Convert an OperationCsvRecord to an Operation
///
/// # Arguments
///
/// * `record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(Operation) - Successfully converted record
/// - Err(LedgerError::ParseError) - The row is malformed (no line number yet)
pub fn convert_csv_record(record: OperationCsvRecord) -> Result<Operation, LedgerError> {
    let op = record.op.to_lowercase();
    let counterparty = non_empty(record.counterparty);
    let memo = non_empty(record.memo);
    let key = non_empty(record.key);

    match op.as_str() {
        "register" => {
            let email = counterparty.ok_or_else(|| malformed("register requires an email"))?;
            Ok(Operation::Register {
                name: memo.unwrap_or_default(),
                email,
            })
        }
        "topup" | "top_up" => Ok(Operation::TopUp {
            user: required_user(record.user, &op)?,
            amount: required_amount(record.amount, &op)?,
            idempotency_key: key,
        }),
        "transfer" => {
            let user = required_user(record.user, &op)?;
            let destination =
                counterparty.ok_or_else(|| malformed("transfer requires a counterparty"))?;
            Ok(Operation::Transfer {
                user,
                destination,
                amount: required_amount(record.amount, &op)?,
                memo,
                idempotency_key: key,
            })
        }
        _ => Err(malformed(format!("Invalid operation: '{}'", record.op))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required_user(user: Option<OwnerId>, op: &str) -> Result<OwnerId, LedgerError> {
    user.ok_or_else(|| malformed(format!("{} requires a user", op)))
}

fn required_amount(amount: Option<String>, op: &str) -> Result<Decimal, LedgerError> {
    let amount = non_empty(amount)
        .ok_or_else(|| malformed(format!("{} requires an amount", op)))?;
    Decimal::from_str(&amount)
        .map_err(|_| malformed(format!("Invalid amount '{}' for {}", amount, op)))
}

fn malformed(message: impl Into<String>) -> LedgerError {
    LedgerError::ParseError {
        line: None,
        message: message.into(),
    }
}

/// Write wallet balances in CSV format
///
/// Writes wallets with columns: wallet, user, balance. Wallets are sorted by
/// wallet id for deterministic output and balances carry two decimals.
///
/// # Arguments
///
/// * `accounts` - Slice of wallets to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_wallets_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["wallet", "user", "balance"])?;

    let mut sorted = accounts.to_vec();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer.write_record(&[
            account.id.to_string(),
            account.owner.to_string(),
            format!("{:.2}", account.balance),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
