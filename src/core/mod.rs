//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Store and unit-of-work abstractions
//! - `engine` - Top-up and transfer orchestration
//! - `history` - Paginated ledger reads
//! - `service` - Facade tying the pieces together
//! - `memory` - In-memory backend

pub mod engine;
pub mod history;
pub mod memory;
pub mod service;
pub mod traits;

pub use engine::TransferEngine;
pub use history::HistoryReader;
pub use memory::{MemoryBackend, MemoryDirectory};
pub use service::WalletService;
pub use traits::{AccountStore, Backend, LedgerStore, UnitOfWorkFactory, UserDirectory};
