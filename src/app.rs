//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads configuration from the environment
//! - wires the HTTP adapters into the pipeline
//! - prints a one-line summary

use clap::Parser;
use tracing::error;

use crate::bigquery::BigQueryClient;
use crate::config::Config;
use crate::error::AppError;
use crate::ledger::SheetsClient;
use crate::poller::ThreadSleeper;

pub mod pipeline;

pub use pipeline::{RunStatus, run_once, run_pipeline, today_in};

/// Entry point for the `cost-ledger` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init_subscriber(&cli.log_level);

    let mut config = Config::from_env(cli.env_file.as_deref()).inspect_err(|err| {
        error!(error = %err, "failed to load configuration");
    })?;
    config.dry_run = cli.dry_run;

    let token = config.access_token.clone().ok_or_else(|| {
        error!("GOOGLE_OAUTH_ACCESS_TOKEN is not set");
        AppError::new(2, "Missing GOOGLE_OAUTH_ACCESS_TOKEN in environment (.env).")
    })?;

    let engine = BigQueryClient::new(config.project_id.clone(), token.clone());
    let store = SheetsClient::new(config.ledger.spreadsheet_id.clone(), token);
    let today = today_in(config.timezone);

    match run_once(&config, &engine, &store, &ThreadSleeper, today) {
        RunStatus::Completed(report) => {
            println!("{}", crate::report::format_run_summary(&report));
            Ok(())
        }
        RunStatus::Failed { exit_code, message } => Err(AppError::new(exit_code, message)),
    }
}
