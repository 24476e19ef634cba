//! Run summaries for logs and terminal output.

use chrono::NaiveDate;

use crate::domain::{CostAmount, LedgerOutcome};

pub mod format;

pub use format::*;

/// Everything a successful pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub date: NaiveDate,
    pub job_id: String,
    pub polls: u32,
    pub amount: CostAmount,
    pub ledger: LedgerOutcome,
}
