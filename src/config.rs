//! Ledger configuration
//!
//! Values come from the command line (with `WALLET_LEDGER_*` environment
//! fallbacks). Invalid values fall back to the defaults with a warning.

use std::time::Duration;
use tracing::warn;

/// Tunables of the ledger service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Longest a unit waits for an account lease before failing with `Conflict`
    pub lock_timeout: Duration,
    /// Page size used when a history request asks for an out-of-range limit
    pub default_page_size: u32,
    /// Largest page size a history request may ask for
    pub max_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl LedgerConfig {
    /// Create a new LedgerConfig with custom values
    pub fn new(lock_timeout: Duration, default_page_size: u32, max_page_size: u32) -> Self {
        let default = Self::default();

        let lock_timeout = if lock_timeout.is_zero() {
            warn!(
                lock_timeout_ms = 0,
                default_ms = default.lock_timeout.as_millis() as u64,
                "invalid lock timeout, using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        let max_page_size = if max_page_size == 0 {
            warn!(
                max_page_size,
                default = default.max_page_size,
                "invalid max page size, using default"
            );
            default.max_page_size
        } else {
            max_page_size
        };

        let default_page_size = if default_page_size == 0 || default_page_size > max_page_size {
            let fallback = default.default_page_size.min(max_page_size);
            warn!(
                default_page_size,
                max_page_size, fallback, "invalid default page size, using fallback"
            );
            fallback
        } else {
            default_page_size
        };

        Self {
            lock_timeout,
            default_page_size,
            max_page_size,
        }
    }
}
