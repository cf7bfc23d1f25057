//! Wallet Ledger Library
//! # Overview
//!
//! This library keeps per-user wallet balances and records every
//! balance-affecting operation (top-up, transfer) as an immutable ledger
//! entry. Every operation runs as one unit of work: either all of its writes
//! commit or none do.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, LedgerEntry, LedgerError, etc.)
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - Store and unit-of-work abstractions
//!   - [`core::engine`] - Top-up and transfer orchestration
//!   - [`core::history`] - Paginated ledger reads
//!   - [`core::memory`] - In-memory backend with per-account leases
//!   - [`core::service`] - Facade used by callers
//! - [`config`] - Ledger tunables
//! - [`logging`] - Tracing subscriber setup
//! - [`io`] - Replay CSV input and wallet output
//! - [`strategy`] - Sequential and concurrent replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Guarantees
//!
//! - A balance never goes negative
//! - A transfer's debit and credit commit together or not at all
//! - Accounts are always locked in ascending id order, so concurrent
//!   transfers in opposite directions cannot deadlock
//! - Readers never observe a partially committed operation
//!
//! ```no_run
//! use wallet_ledger::{LedgerConfig, TopUpRequest, TransferRequest, WalletService};
//! use rust_decimal::Decimal;
//!
//! # async fn demo() -> Result<(), wallet_ledger::LedgerError> {
//! let service = WalletService::in_memory(&LedgerConfig::default());
//! let (alice, _) = service.register("alice@example.com", "Alice").await?;
//! service.register("bob@example.com", "Bob").await?;
//!
//! service
//!     .top_up(alice.id, TopUpRequest { amount: Decimal::new(100, 0), idempotency_key: None })
//!     .await?;
//! let transfer = service
//!     .transfer(
//!         alice.id,
//!         TransferRequest {
//!             destination: "bob@example.com".to_string(),
//!             amount: Decimal::new(30, 0),
//!             memo: None,
//!             idempotency_key: None,
//!         },
//!     )
//!     .await?;
//! assert_eq!(transfer.new_balance.to_string(), "70.00");
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::LedgerConfig;
pub use core::{HistoryReader, MemoryBackend, TransferEngine, WalletService};
pub use io::write_wallets_csv;
pub use types::{
    Account, AccountId, BalanceView, EntryId, EntryStatus, EntryType, HistoryResult,
    LedgerEntry, LedgerError, OwnerId, TopUpRequest, TopUpResult, TransferRequest,
    TransferResult,
};
