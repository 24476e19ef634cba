//! Run configuration.
//!
//! A `Config` is built once per invocation (normally from the environment and
//! an optional `.env` file) and handed to the pipeline explicitly.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::PipelineError;
use crate::ledger::DuplicatePolicy;
use crate::poller::PollPolicy;

pub const DEFAULT_TAX_FACTOR: f64 = 1.23;
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Warsaw;

/// Placeholder left in the project id by unconfigured deployments.
pub const PROJECT_PLACEHOLDER: &str = "YOUR_PROJECT_ID";

/// Longest backoff budget a run may be configured with.
pub const MAX_POLL_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

const ENV_PROJECT_ID: &str = "COST_LEDGER_PROJECT_ID";
const ENV_TABLE: &str = "COST_LEDGER_TABLE";
const ENV_SPREADSHEET_ID: &str = "COST_LEDGER_SPREADSHEET_ID";
const ENV_SHEET_NAME: &str = "COST_LEDGER_SHEET_NAME";
const ENV_TAX_FACTOR: &str = "COST_LEDGER_TAX_FACTOR";
const ENV_TIMEZONE: &str = "COST_LEDGER_TIMEZONE";
const ENV_DATE_COLUMN: &str = "COST_LEDGER_DATE_COLUMN";
const ENV_VALUE_COLUMN: &str = "COST_LEDGER_VALUE_COLUMN";
const ENV_POLL_BASE_MS: &str = "COST_LEDGER_POLL_BASE_MS";
const ENV_POLL_MAX_WAIT_SECS: &str = "COST_LEDGER_POLL_MAX_WAIT_SECS";
const ENV_STRICT_DATES: &str = "COST_LEDGER_STRICT_DATES";
const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Where in the workbook the ledger lives.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// 1-based column holding the dates.
    pub date_column: usize,
    /// 1-based column receiving the gross amount.
    pub value_column: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    /// Fully-qualified `project.dataset.table` of the billing export.
    pub table_reference: String,
    pub ledger: LedgerTarget,
    /// Multiplier applied to the net amount (1.23 = +23%).
    pub tax_factor: f64,
    /// Timezone defining "today" for both the query and the ledger match.
    pub timezone: Tz,
    pub poll: PollPolicy,
    pub duplicate_policy: DuplicatePolicy,
    /// Locate the row but skip the write.
    pub dry_run: bool,
    /// Bearer token for the HTTP adapters.
    pub access_token: Option<String>,
}

impl Config {
    /// Load `.env` (or `env_file`) and read configuration from the environment.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self, PipelineError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    PipelineError::configuration(format!(
                        "failed to load env file '{}': {e}",
                        path.display()
                    ))
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, PipelineError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PipelineError::configuration(format!("missing {key} in environment (.env)")))
        };

        let tax_factor = parse_or(&lookup, ENV_TAX_FACTOR, DEFAULT_TAX_FACTOR)?;
        let timezone = match lookup(ENV_TIMEZONE) {
            Some(name) if !name.trim().is_empty() => Tz::from_str(name.trim())
                .map_err(|_| PipelineError::configuration(format!("unknown timezone '{name}'")))?,
            _ => DEFAULT_TIMEZONE,
        };

        let poll = PollPolicy {
            base_interval: Duration::from_millis(parse_or(&lookup, ENV_POLL_BASE_MS, 500u64)?),
            max_wait: Duration::from_secs(parse_or(&lookup, ENV_POLL_MAX_WAIT_SECS, 120u64)?),
        };

        let duplicate_policy = if parse_or(&lookup, ENV_STRICT_DATES, false)? {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::FirstMatch
        };

        let config = Config {
            project_id: required(ENV_PROJECT_ID)?,
            table_reference: required(ENV_TABLE)?,
            ledger: LedgerTarget {
                spreadsheet_id: required(ENV_SPREADSHEET_ID)?,
                sheet_name: required(ENV_SHEET_NAME)?,
                date_column: parse_or(&lookup, ENV_DATE_COLUMN, 1usize)?,
                value_column: parse_or(&lookup, ENV_VALUE_COLUMN, 2usize)?,
            },
            tax_factor,
            timezone,
            poll,
            duplicate_policy,
            dry_run: false,
            access_token: lookup(ENV_ACCESS_TOKEN).filter(|t| !t.trim().is_empty()),
        };
        Ok(config)
    }

    /// Reject placeholder or nonsensical settings. Runs before any remote call.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.project_id.trim().is_empty() || self.project_id.contains(PROJECT_PLACEHOLDER) {
            return Err(PipelineError::configuration(
                "project id is missing; set COST_LEDGER_PROJECT_ID",
            ));
        }
        crate::query::validate_table_reference(&self.table_reference)?;

        if self.ledger.sheet_name.trim().is_empty() {
            return Err(PipelineError::configuration("sheet name is empty"));
        }
        if self.ledger.date_column == 0 || self.ledger.value_column == 0 {
            return Err(PipelineError::configuration("ledger columns are 1-based"));
        }
        if self.ledger.date_column == self.ledger.value_column {
            return Err(PipelineError::configuration(
                "date column and value column must differ",
            ));
        }
        if !(self.tax_factor.is_finite() && self.tax_factor > 0.0) {
            return Err(PipelineError::configuration(format!(
                "tax factor must be a positive number, got {}",
                self.tax_factor
            )));
        }
        if self.poll.base_interval.is_zero() {
            return Err(PipelineError::configuration("poll base interval must be non-zero"));
        }
        if self.poll.max_wait > MAX_POLL_WAIT {
            return Err(PipelineError::configuration(format!(
                "poll max wait of {}s exceeds the {}s limit",
                self.poll.max_wait.as_secs(),
                MAX_POLL_WAIT.as_secs()
            )));
        }
        if self.poll.max_wait < self.poll.base_interval {
            return Err(PipelineError::configuration(format!(
                "poll max wait ({} ms) is shorter than the base interval ({} ms); no poll would ever run",
                self.poll.max_wait.as_millis(),
                self.poll.base_interval.as_millis()
            )));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, PipelineError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| PipelineError::configuration(format!("invalid {key} '{raw}': {e}"))),
        _ => Ok(default),
    }
}
