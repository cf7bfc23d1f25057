//! Replay strategy module
//!
//! A replay strategy reads an operations CSV, applies every operation to a
//! fresh in-memory ledger and writes the final wallet balances. Strategies are
//! selected at runtime (sequential or concurrent).

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;

pub mod batch_processor;
pub mod concurrent;
pub mod sequential;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use concurrent::{BatchConfig, ConcurrentReplayStrategy};
pub use sequential::SequentialReplayStrategy;

/// Counts reported at the end of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Operations that committed
    pub applied: u64,
    /// Operations the ledger rejected
    pub rejected: u64,
    /// Rows that could not be parsed
    pub malformed: u64,
}

/// Replay pipeline trait
pub trait ReplayStrategy: Send + Sync {
    /// Replay the operations in `input_path` and write wallet balances to `output`
    ///
    /// Malformed rows and rejected operations are logged and skipped; they do
    /// not fail the replay.
    ///
    /// # Errors
    ///
    /// * `FileNotFound` / `IoError` - the input cannot be opened or read
    /// * `IoError` - the output cannot be written
    /// * `Internal` - the runtime could not be started
    fn process(&self, input_path: &Path, output: &mut dyn Write)
        -> Result<ReplaySummary, LedgerError>;
}

/// Create a replay strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Sequential or concurrent replay
/// * `ledger` - Ledger tunables for the in-memory ledger
/// * `batch` - Batch configuration (ignored for sequential replay)
pub fn create_strategy(
    strategy_type: StrategyType,
    ledger: LedgerConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ReplayStrategy> {
    match strategy_type {
        StrategyType::Sequential => Box::new(SequentialReplayStrategy::new(ledger)),
        StrategyType::Concurrent => Box::new(ConcurrentReplayStrategy::new(
            ledger,
            batch.unwrap_or_default(),
        )),
    }
}
