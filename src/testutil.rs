//! In-memory stand-ins for the remote collaborators, shared by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::LedgerTarget;
use crate::domain::{CellValue, JobHandle, QuerySpec};
use crate::error::{LedgerError, PipelineError};
use crate::ledger::LedgerStore;
use crate::poller::{QueryEngine, Sleeper};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn date_time(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

pub fn target() -> LedgerTarget {
    LedgerTarget {
        spreadsheet_id: "sheet-1".to_string(),
        sheet_name: "PRICES".to_string(),
        date_column: 1,
        value_column: 2,
    }
}

/// Engine that replays a fixed sequence of handles: first on submit, then one per poll.
pub struct ScriptedEngine {
    script: RefCell<VecDeque<JobHandle>>,
    repeat_last: bool,
    submits: Cell<u32>,
    polls: Cell<u32>,
    last_spec: RefCell<Option<QuerySpec>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<JobHandle>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            repeat_last: false,
            submits: Cell::new(0),
            polls: Cell::new(0),
            last_spec: RefCell::new(None),
        }
    }

    /// Replays the same finished handle for every submission.
    pub fn always(handle: JobHandle) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![handle])
        }
    }

    pub fn never_completes(job_id: &str) -> Self {
        Self::always(JobHandle::pending(job_id, "acme-prod"))
    }

    pub fn submit_count(&self) -> u32 {
        self.submits.get()
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.get()
    }

    pub fn last_spec(&self) -> Option<QuerySpec> {
        self.last_spec.borrow().clone()
    }

    fn next(&self) -> Result<JobHandle, PipelineError> {
        let mut script = self.script.borrow_mut();
        if self.repeat_last && script.len() == 1 {
            return Ok(script[0].clone());
        }
        script
            .pop_front()
            .ok_or_else(|| PipelineError::transport("test engine", "script exhausted"))
    }
}

impl QueryEngine for ScriptedEngine {
    fn submit(&self, spec: &QuerySpec) -> Result<JobHandle, PipelineError> {
        self.submits.set(self.submits.get() + 1);
        *self.last_spec.borrow_mut() = Some(spec.clone());
        self.next()
    }

    fn poll(&self, _handle: &JobHandle) -> Result<JobHandle, PipelineError> {
        self.polls.set(self.polls.get() + 1);
        self.next()
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    intervals: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn intervals(&self) -> Vec<Duration> {
        self.intervals.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, interval: Duration) {
        self.intervals.borrow_mut().push(interval);
    }
}

/// Two-column grid: dates in column 1, values in column 2.
#[derive(Default)]
pub struct MemoryLedger {
    dates: RefCell<Vec<CellValue>>,
    values: RefCell<BTreeMap<usize, f64>>,
    writes: Cell<u32>,
    shift_after_read: Cell<bool>,
    fail_reads: Cell<bool>,
}

impl MemoryLedger {
    pub fn with_dates(dates: Vec<CellValue>) -> Self {
        Self {
            dates: RefCell::new(dates),
            ..Self::default()
        }
    }

    pub fn value_at(&self, row: usize) -> Option<f64> {
        self.values.borrow().get(&row).copied()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    pub fn row_count(&self) -> usize {
        self.dates.borrow().len()
    }

    /// Insert a blank row at the top right after the next column read.
    pub fn shift_dates_after_snapshot(&self) {
        self.shift_after_read.set(true);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.set(true);
    }
}

impl LedgerStore for MemoryLedger {
    fn get_column_range(
        &self,
        sheet: &str,
        column: usize,
        row_count: Option<usize>,
    ) -> Result<Vec<CellValue>, PipelineError> {
        if self.fail_reads.get() {
            return Err(LedgerError::Store {
                sheet: sheet.to_string(),
                message: "unavailable".to_string(),
            }
            .into());
        }
        assert_eq!(column, 1, "test ledger keeps dates in column 1");
        let mut snapshot = self.dates.borrow().clone();
        if let Some(n) = row_count {
            snapshot.resize(n, CellValue::Empty);
        }
        if self.shift_after_read.replace(false) {
            self.dates.borrow_mut().insert(0, CellValue::Empty);
        }
        Ok(snapshot)
    }

    fn get_cell(&self, _sheet: &str, row: usize, column: usize) -> Result<CellValue, PipelineError> {
        Ok(match column {
            1 => self
                .dates
                .borrow()
                .get(row - 1)
                .cloned()
                .unwrap_or(CellValue::Empty),
            _ => self
                .value_at(row)
                .map(CellValue::Number)
                .unwrap_or(CellValue::Empty),
        })
    }

    fn set_cell(&self, _sheet: &str, row: usize, column: usize, value: f64) -> Result<(), PipelineError> {
        assert_eq!(column, 2, "test ledger keeps values in column 2");
        self.values.borrow_mut().insert(row, value);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

pub fn config() -> crate::config::Config {
    crate::config::Config {
        project_id: "acme-prod".to_string(),
        table_reference: "acme-prod.billing_data.gcp_billing_export_v1_0A1B2C".to_string(),
        ledger: target(),
        tax_factor: crate::config::DEFAULT_TAX_FACTOR,
        timezone: crate::config::DEFAULT_TIMEZONE,
        poll: crate::poller::PollPolicy {
            base_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(60),
        },
        duplicate_policy: crate::ledger::DuplicatePolicy::FirstMatch,
        dry_run: false,
        access_token: None,
    }
}
