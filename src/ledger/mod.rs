//! Date-keyed ledger update.
//!
//! The ledger is a remote grid with one row per calendar date. We read the
//! date column once, find today's row (first match wins), re-check the key cell
//! and write the amount into the paired value column. A missing row is a
//! warning-level outcome, not an error.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::LedgerTarget;
use crate::domain::{CellValue, LedgerOutcome, LedgerRow};
use crate::error::{LedgerError, PipelineError};

pub mod sheets;

pub use sheets::SheetsClient;

/// Remote grid operations. Rows and columns are 1-based.
pub trait LedgerStore {
    /// Read `column` from row 1 down. `None` reads to the last used row.
    fn get_column_range(
        &self,
        sheet: &str,
        column: usize,
        row_count: Option<usize>,
    ) -> Result<Vec<CellValue>, PipelineError>;

    fn get_cell(&self, sheet: &str, row: usize, column: usize) -> Result<CellValue, PipelineError>;

    fn set_cell(&self, sheet: &str, row: usize, column: usize, value: f64) -> Result<(), PipelineError>;
}

/// How to treat several rows carrying the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Use the first matching row and ignore the rest.
    #[default]
    FirstMatch,
    /// Fail the update if the date appears more than once.
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub duplicates: DuplicatePolicy,
    /// Locate the row but do not write.
    pub dry_run: bool,
}

/// 1-based index of the first date cell falling on `today`.
///
/// Cells that are not dates (blank, text, numbers) are skipped.
pub fn find_today_row(cells: &[CellValue], today: NaiveDate) -> Option<usize> {
    cells
        .iter()
        .position(|cell| cell.calendar_date() == Some(today))
        .map(|idx| idx + 1)
}

/// Every 1-based row whose date cell falls on `today`, in order.
pub fn matching_rows(cells: &[CellValue], today: NaiveDate) -> Vec<usize> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.calendar_date() == Some(today))
        .map(|(idx, _)| idx + 1)
        .collect()
}

/// Write `value` next to today's date, if the ledger has a row for it.
pub fn update_today<L>(
    store: &L,
    target: &LedgerTarget,
    today: NaiveDate,
    value: f64,
    options: UpdateOptions,
) -> Result<LedgerOutcome, PipelineError>
where
    L: LedgerStore + ?Sized,
{
    let sheet = target.sheet_name.as_str();
    let cells = store.get_column_range(sheet, target.date_column, None)?;
    debug!(sheet, rows = cells.len(), "read ledger date column");

    let row_index = match options.duplicates {
        DuplicatePolicy::FirstMatch => find_today_row(&cells, today),
        DuplicatePolicy::Reject => {
            let rows = matching_rows(&cells, today);
            if rows.len() > 1 {
                return Err(LedgerError::DuplicateDate { date: today, rows }.into());
            }
            rows.first().copied()
        }
    };

    let Some(row_index) = row_index else {
        warn!(sheet, %today, "today's date not found in the ledger; nothing written");
        return Ok(LedgerOutcome::NotFound { date: today });
    };

    let row = LedgerRow {
        row_index,
        date: today,
        value,
    };

    if options.dry_run {
        info!(sheet, row = row_index, value, "dry run: ledger row located, write skipped");
        return Ok(LedgerOutcome::Located(row));
    }

    // The snapshot may be stale; make sure the key cell still holds today.
    let current = store.get_cell(sheet, row_index, target.date_column)?;
    if current.calendar_date() != Some(today) {
        return Err(LedgerError::Conflict {
            row: row_index,
            expected: today.to_string(),
            found: current.to_string(),
        }
        .into());
    }

    store.set_cell(sheet, row_index, target.value_column, value)?;
    info!(sheet, row = row_index, value, "ledger updated");
    Ok(LedgerOutcome::Updated(row))
}
