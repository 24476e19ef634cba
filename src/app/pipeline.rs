//! The daily cost pipeline.
//!
//! query build -> job submit/poll -> net extraction -> gross conversion -> ledger write
//!
//! The only mutation is the final single-cell write, so a failure at any
//! earlier stage leaves the ledger untouched.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::convert::convert;
use crate::domain::LedgerOutcome;
use crate::error::PipelineError;
use crate::extract::extract_net_amount;
use crate::ledger::{LedgerStore, UpdateOptions, update_today};
use crate::poller::{QueryEngine, Sleeper, run_query_job};
use crate::query::build_daily_cost_query;
use crate::report::{RunReport, format_amount};

/// How a fire-and-forget run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed(RunReport),
    Failed { exit_code: u8, message: String },
}

/// Calendar date "now" in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Run every stage and return what happened, or the first failure.
pub fn run_pipeline<E, L, S>(
    config: &Config,
    engine: &E,
    store: &L,
    sleeper: &S,
    today: NaiveDate,
) -> Result<RunReport, PipelineError>
where
    E: QueryEngine + ?Sized,
    L: LedgerStore + ?Sized,
    S: Sleeper + ?Sized,
{
    config.validate()?;
    info!(
        project = %config.project_id,
        sheet = %config.ledger.sheet_name,
        %today,
        timezone = config.timezone.name(),
        "cost ledger run started"
    );

    let spec = build_daily_cost_query(&config.project_id, &config.table_reference, config.timezone)?;
    let job = run_query_job(engine, &spec, &config.poll, sleeper)?;

    let net = extract_net_amount(&job.result)?;
    let amount = convert(net, config.tax_factor);
    info!(
        job_id = %job.job_id,
        polls = job.polls,
        net = %format_amount(amount.net),
        gross = %format_amount(amount.gross),
        "daily cost retrieved"
    );

    let options = UpdateOptions {
        duplicates: config.duplicate_policy,
        dry_run: config.dry_run,
    };
    let ledger = update_today(store, &config.ledger, today, amount.gross, options)?;

    Ok(RunReport {
        date: today,
        job_id: job.job_id,
        polls: job.polls,
        amount,
        ledger,
    })
}

/// Run the pipeline once, logging the outcome instead of propagating it.
pub fn run_once<E, L, S>(config: &Config, engine: &E, store: &L, sleeper: &S, today: NaiveDate) -> RunStatus
where
    E: QueryEngine + ?Sized,
    L: LedgerStore + ?Sized,
    S: Sleeper + ?Sized,
{
    match run_pipeline(config, engine, store, sleeper, today) {
        Ok(report) => {
            match &report.ledger {
                LedgerOutcome::NotFound { date } => {
                    warn!(
                        %date,
                        gross = %format_amount(report.amount.gross),
                        "run finished without a ledger row for today"
                    );
                }
                LedgerOutcome::Updated(_) | LedgerOutcome::Located(_) => {
                    info!(gross = %format_amount(report.amount.gross), "run finished");
                }
            }
            RunStatus::Completed(report)
        }
        Err(err) => {
            error!(error = %err, detail = ?err, "cost ledger run failed");
            RunStatus::Failed {
                exit_code: err.exit_code(),
                message: err.to_string(),
            }
        }
    }
}
