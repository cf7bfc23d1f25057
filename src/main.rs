//! Wallet Ledger CLI
//!
//! Replays an operations CSV against a fresh in-memory ledger and prints the
//! final wallet balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > wallets.csv
//! cargo run -- --strategy concurrent --batch-size 500 --max-concurrent 8 operations.csv
//! RUST_LOG=debug cargo run -- --log-format json operations.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success (rejected operations and malformed rows are logged, not fatal)
//! - 1: Error (file not found, file not readable, output not writable)

use anyhow::Context;
use wallet_ledger::cli;
use wallet_ledger::logging;
use wallet_ledger::strategy;

fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();
    logging::init_logging(args.log_format);

    let strategy = {
        let batch = if matches!(args.strategy, cli::StrategyType::Concurrent) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, args.to_ledger_config(), batch)
    };

    let mut output = std::io::stdout();
    strategy
        .process(&args.input_file, &mut output)
        .with_context(|| format!("replay of {} failed", args.input_file.display()))?;

    Ok(())
}
