use crate::config::LedgerConfig;
use crate::logging::LogFormat;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay wallet operations against an in-memory ledger
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger")]
#[command(about = "Replay wallet operations and print final balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing operations
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sequential",
        env = "WALLET_LEDGER_STRATEGY",
        help = "Replay strategy: 'sequential' for file order or 'concurrent' for parallel users"
    )]
    pub strategy: StrategyType,

    /// Number of operations per batch (concurrent mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        env = "WALLET_LEDGER_BATCH_SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (concurrent mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        env = "WALLET_LEDGER_MAX_CONCURRENT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// How long a unit of work waits for an account lease
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        default_value_t = 5000,
        env = "WALLET_LEDGER_LOCK_TIMEOUT_MS"
    )]
    pub lock_timeout_ms: u64,

    /// History page size used when a request gives none or an invalid one
    #[arg(
        long = "default-page-size",
        value_name = "SIZE",
        default_value_t = 10,
        env = "WALLET_LEDGER_DEFAULT_PAGE_SIZE"
    )]
    pub default_page_size: u32,

    /// Largest history page size
    #[arg(
        long = "max-page-size",
        value_name = "SIZE",
        default_value_t = 100,
        env = "WALLET_LEDGER_MAX_PAGE_SIZE"
    )]
    pub max_page_size: u32,

    /// Log output format (filter with RUST_LOG)
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        default_value = "text",
        env = "WALLET_LEDGER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sequential,
    Concurrent,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values use the defaults; invalid ones fall back to them with a
    /// warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig::new(
            Duration::from_millis(self.lock_timeout_ms),
            self.default_page_size,
            self.max_page_size,
        )
    }
}
