//! Replayable operations
//!
//! An `Operation` is one parsed row of a replay file. The service applies it
//! and reports an `OperationOutcome`.

use super::account::{Account, OwnerId};
use super::outcome::{TopUpResult, TransferResult};
use super::user::User;
use rust_decimal::Decimal;

/// One ledger operation issued on behalf of a user
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a user and open their wallet
    Register { email: String, name: String },

    /// Credit the user's own wallet
    TopUp {
        user: OwnerId,
        amount: Decimal,
        idempotency_key: Option<String>,
    },

    /// Move money from the user's wallet to `destination` (email or user id)
    Transfer {
        user: OwnerId,
        destination: String,
        amount: Decimal,
        memo: Option<String>,
        idempotency_key: Option<String>,
    },
}

impl Operation {
    /// User on whose behalf the operation runs
    ///
    /// Registrations have no initiator yet.
    pub fn initiator(&self) -> Option<OwnerId> {
        match self {
            Operation::Register { .. } => None,
            Operation::TopUp { user, .. } | Operation::Transfer { user, .. } => Some(*user),
        }
    }
}

/// Result of applying one operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Registered { user: User, account: Account },
    ToppedUp(TopUpResult),
    Transferred(TransferResult),
}
