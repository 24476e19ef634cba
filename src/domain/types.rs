//! Shared domain types.
//!
//! Everything here is transient: built during one run and dropped at the end.
//! The only persistent state lives in the remote ledger.

use chrono::{NaiveDate, NaiveDateTime};

/// A typed scalar bound to a named query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int64(i64),
    Float64(f64),
    Date(NaiveDate),
}

impl ParamValue {
    /// Engine type name for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "STRING",
            ParamValue::Int64(_) => "INT64",
            ParamValue::Float64(_) => "FLOAT64",
            ParamValue::Date(_) => "DATE",
        }
    }

    /// Wire encoding of the value (the engine takes every scalar as a string).
    pub fn wire_value(&self) -> String {
        match self {
            ParamValue::String(s) => s.clone(),
            ParamValue::Int64(v) => v.to_string(),
            ParamValue::Float64(v) => v.to_string(),
            ParamValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    pub value: ParamValue,
}

/// SQL text plus its named parameters. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    sql: String,
    parameters: Vec<QueryParameter>,
}

impl QuerySpec {
    pub fn new(sql: impl Into<String>, parameters: Vec<QueryParameter>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// One result row: nullable scalars in column order.
pub type Row = Vec<Option<String>>;

/// Rows returned by a completed job (possibly none).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// First field of the first row, if the set has one.
    pub fn first_field(&self) -> Option<&Option<String>> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Rows(ResultSet),
    Failed(String),
}

/// Handle to a submitted job, replaced by every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub job_id: String,
    pub project_ref: String,
    /// Region the job runs in; required by some engines when polling.
    pub location: Option<String>,
    pub complete: bool,
    /// Set once `complete` is true.
    pub outcome: Option<JobOutcome>,
}

impl JobHandle {
    pub fn pending(job_id: impl Into<String>, project_ref: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            project_ref: project_ref.into(),
            location: None,
            complete: false,
            outcome: None,
        }
    }

    pub fn finished(job_id: impl Into<String>, project_ref: impl Into<String>, outcome: JobOutcome) -> Self {
        Self {
            job_id: job_id.into(),
            project_ref: project_ref.into(),
            location: None,
            complete: true,
            outcome: Some(outcome),
        }
    }
}

/// A single ledger cell as read from the date column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Date(NaiveDateTime),
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Calendar date of a date cell; everything else has none.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(dt) => Some(dt.date()),
            _ => None,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Date(dt) => write!(f, "{dt}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => write!(f, "{s:?}"),
            CellValue::Empty => write!(f, "<empty>"),
        }
    }
}

/// The ledger row matched for today.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    /// 1-based, same numbering as the remote table.
    pub row_index: usize,
    pub date: NaiveDate,
    pub value: f64,
}

/// Result of a ledger update attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    /// Row found and written.
    Updated(LedgerRow),
    /// Row found, write skipped (dry run).
    Located(LedgerRow),
    /// No row carries today's date. Non-fatal.
    NotFound { date: NaiveDate },
}

impl LedgerOutcome {
    pub fn row(&self) -> Option<&LedgerRow> {
        match self {
            LedgerOutcome::Updated(row) | LedgerOutcome::Located(row) => Some(row),
            LedgerOutcome::NotFound { .. } => None,
        }
    }
}

/// Net cost and its gross counterpart after the fixed factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostAmount {
    pub net: f64,
    pub gross: f64,
}
