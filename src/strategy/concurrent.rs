//! Concurrent replay strategy
//!
//! This module provides a multi-threaded replay pipeline that exercises the
//! ledger the way concurrent request handlers would.
//!
//! # Architecture
//!
//! ```text
//! ConcurrentReplayStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (user partitioning + tokio tasks)
//!     └── WalletService (in-memory ledger shared by all tasks)
//! ```
//!
//! # Ordering
//!
//! - Batches are applied one after another
//! - Within a batch, registrations run first in file order
//! - Each user's operations keep their file order
//! - Operations of different users run in parallel and may interleave

use crate::config::LedgerConfig;
use crate::core::WalletService;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_wallets_csv;
use crate::strategy::{BatchProcessor, ReplayStrategy, ReplaySummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration for batch processing
///
/// Controls how operations are batched and the number of worker threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid worker count, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Concurrent replay strategy
#[derive(Debug, Clone)]
pub struct ConcurrentReplayStrategy {
    ledger: LedgerConfig,
    config: BatchConfig,
}

impl ConcurrentReplayStrategy {
    pub fn new(ledger: LedgerConfig, config: BatchConfig) -> Self {
        Self { ledger, config }
    }
}

impl ReplayStrategy for ConcurrentReplayStrategy {
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ReplaySummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_all()
            .build()
            .map_err(|e| LedgerError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        let (wallets, summary) = runtime.block_on(async {
            let service = WalletService::in_memory(&self.ledger);
            let processor = BatchProcessor::new(service.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                        path: input_path.display().to_string(),
                    },
                    _ => LedgerError::from(e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ReplaySummary::default();
            let mut batch_number = 0_u64;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }
                batch_number += 1;
                debug!(batch = batch_number, size = batch.len(), "applying batch");

                for result in processor.process_batch(batch).await {
                    match result.result {
                        Ok(_) => summary.applied += 1,
                        Err(_) => summary.rejected += 1,
                    }
                }
            }
            summary.malformed = reader.skipped();

            service
                .wallets()
                .await
                .map(|wallets| (wallets, summary))
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
