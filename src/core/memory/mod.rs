//! In-memory backend
//!
//! This module provides thread-safe, concurrent implementations of the store
//! traits on top of `DashMap`, with per-account `tokio::sync::Mutex` leases.
//!
//! # Architecture
//!
//! ```text
//! MemoryBackend
//!     ├── MemoryUnits         (begin / commit / rollback)
//!     ├── MemoryAccountStore  (balances, leases)
//!     └── MemoryLedgerStore   (entries, idempotency index)
//!             all sharing Arc<MemoryDatabase>
//! ```
//!
//! # Thread Safety
//!
//! - Units touching different accounts proceed in parallel
//! - Units touching the same account are serialized by its lease
//! - Commits are published behind one gate, so readers never see half a unit

pub mod account_store;
pub mod database;
pub mod directory;
pub mod ledger_store;

pub use account_store::MemoryAccountStore;
pub use database::{MemoryDatabase, MemoryUnit, MemoryUnits};
pub use directory::MemoryDirectory;
pub use ledger_store::MemoryLedgerStore;

use crate::core::traits::Backend;
use std::sync::Arc;
use std::time::Duration;

/// Store bundle of the in-memory backend
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    type Unit = MemoryUnit;
    type Units = MemoryUnits;
    type Accounts = MemoryAccountStore;
    type Ledger = MemoryLedgerStore;
}

impl MemoryBackend {
    /// Build the three stores over one fresh database
    pub fn open(lock_timeout: Duration) -> (MemoryUnits, MemoryAccountStore, MemoryLedgerStore) {
        let db = Arc::new(MemoryDatabase::new(lock_timeout));
        (
            MemoryUnits::new(Arc::clone(&db)),
            MemoryAccountStore::new(Arc::clone(&db)),
            MemoryLedgerStore::new(db),
        )
    }
}
