//! Command-line parsing for the `cost-ledger` binary.
//!
//! The job is meant to be fired by an external scheduler with no arguments;
//! the flags only exist for operators running it by hand.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cost-ledger",
    version,
    about = "Write today's cloud billing cost into a date-indexed spreadsheet ledger"
)]
pub struct Cli {
    /// Load configuration from this env file instead of `.env`.
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Compute the amount and locate the row, but do not write it.
    #[arg(long)]
    pub dry_run: bool,

    /// Log level when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
