//! Sequential replay strategy
//!
//! Applies operations one at a time, in file order, on a single-threaded
//! tokio runtime. The output is fully determined by the input file.

use crate::config::LedgerConfig;
use crate::core::WalletService;
use crate::io::csv_format::write_wallets_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ReplayStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Sequential replay strategy
///
/// ```no_run
/// use wallet_ledger::config::LedgerConfig;
/// use wallet_ledger::strategy::{ReplayStrategy, SequentialReplayStrategy};
/// use std::path::Path;
///
/// let strategy = SequentialReplayStrategy::new(LedgerConfig::default());
/// let mut output = std::io::stdout();
/// strategy.process(Path::new("operations.csv"), &mut output).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SequentialReplayStrategy {
    config: LedgerConfig,
}

impl SequentialReplayStrategy {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

impl ReplayStrategy for SequentialReplayStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LedgerError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        let (wallets, summary) = runtime.block_on(async {
            let service = WalletService::in_memory(&self.config);
            let mut summary = ReplaySummary::default();

            for parsed in reader {
                let operation = match parsed {
                    Ok(operation) => operation,
                    Err(e) => {
                        warn!(error = %e, "skipping malformed row");
                        summary.malformed += 1;
                        continue;
                    }
                };
                match service.apply(operation).await {
                    Ok(_) => summary.applied += 1,
                    Err(_) => summary.rejected += 1,
                }
            }

            service.wallets().await.map(|wallets| (wallets, summary))
        })?;

        write_wallets_csv(&wallets, output)?;
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            malformed = summary.malformed,
            "replay finished"
        );
        Ok(summary)
    }
}
