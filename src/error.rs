//! Error types.
//!
//! - `PipelineError` is what every pipeline stage returns.
//! - `LedgerError` narrows failures of the tabular store seam.
//! - `AppError` is the binary boundary: a message plus a process exit code.

/// Failures raised by any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Required configuration is missing, still a placeholder, or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The query engine finished the job with an execution error.
    #[error("query job {job_id} failed: {message}")]
    RemoteJob { job_id: String, message: String },

    /// The result field could not be read as a number.
    #[error("cannot parse cost value '{raw}' as a number")]
    Parse { raw: String },

    /// The job did not complete before the polling ceiling.
    #[error("query job {job_id} still running after {polls} polls ({waited_ms} ms waited)")]
    Timeout {
        job_id: String,
        polls: u32,
        waited_ms: u128,
    },

    /// HTTP or payload decoding failure talking to a remote collaborator.
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The ledger could not be read or written consistently.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(service: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            service,
            message: message.to_string(),
        }
    }

    /// Process exit code used when this error ends a run.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Configuration(_) => 2,
            _ => 4,
        }
    }
}

/// Failures specific to the date-keyed ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// More than one row carries today's date and strict mode is on.
    #[error("date {date} appears on rows {rows:?}")]
    DuplicateDate {
        date: chrono::NaiveDate,
        rows: Vec<usize>,
    },

    /// The key cell changed between the snapshot read and the write.
    #[error("row {row} changed since it was read (expected {expected}, found {found})")]
    Conflict {
        row: usize,
        expected: String,
        found: String,
    },

    /// The remote store rejected a read or write.
    #[error("sheet '{sheet}': {message}")]
    Store { sheet: String, message: String },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
