//! Human-readable formatting of run results.
//!
//! Amounts are stored unrounded; two decimals is a display concern only.

use crate::domain::LedgerOutcome;
use crate::report::RunReport;

/// Two-decimal display of a currency amount.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// One-line summary of a finished run.
pub fn format_run_summary(report: &RunReport) -> String {
    let ledger = match &report.ledger {
        LedgerOutcome::Updated(row) => format!("row {} updated", row.row_index),
        LedgerOutcome::Located(row) => format!("row {} located (dry run)", row.row_index),
        LedgerOutcome::NotFound { date } => format!("no row for {date}"),
    };
    format!(
        "{date} | net {net} | gross {gross} | job {job} ({polls} polls) | {ledger}",
        date = report.date,
        net = format_amount(report.amount.net),
        gross = format_amount(report.amount.gross),
        job = report.job_id,
        polls = report.polls,
    )
}
