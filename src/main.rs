//! Circulation Engine CLI
//!
//! Command-line interface for replaying circulation actions from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- actions.csv > loans.csv
//! cargo run -- --loan-days 7 --extension-days 3 --max-extensions 1 actions.csv > loans.csv
//! ```
//!
//! The program reads action rows from the input CSV file, drives them
//! through the loan dispatcher, and writes the final loan states to stdout.
//! Row-level errors go to stderr and processing continues.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Fatal error (missing arguments, file not found, output failure)

use circulation_engine::cli;
use circulation_engine::replay::run_replay;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = cli::parse_args();
    let config = args.to_policy_config();

    let mut output = std::io::stdout();
    match run_replay(&args.input_file, config, &mut output) {
        Ok(summary) => {
            if summary.skipped > 0 {
                eprintln!(
                    "Replay finished: {} applied, {} skipped",
                    summary.applied, summary.skipped
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
