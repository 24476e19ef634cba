//! Query job submission and completion polling.
//!
//! The engine is asynchronous: submission returns a handle that may or may not
//! be complete. We wait with a doubling backoff and poll until it is, failing
//! with `PipelineError::Timeout` once the cumulative backoff wait would pass
//! `PollPolicy::max_wait`.
//!
//! `max_wait` bounds only the sleeps between polls. Each poll is itself a
//! request the engine may hold open while the job runs (BigQuery holds it for
//! up to ten seconds), so wall-clock time for a slow job is roughly
//! `max_wait + polls * server wait`.

use std::time::Duration;

use tracing::{debug, info};

use crate::domain::{JobHandle, JobOutcome, QuerySpec, ResultSet};
use crate::error::PipelineError;

/// Remote query engine operations.
pub trait QueryEngine {
    /// Submit a query; the returned handle may already be complete.
    fn submit(&self, spec: &QuerySpec) -> Result<JobHandle, PipelineError>;

    /// Re-read the status (and results, once done) of a submitted job.
    fn poll(&self, handle: &JobHandle) -> Result<JobHandle, PipelineError>;
}

/// Blocking wait between polls.
pub trait Sleeper {
    fn sleep(&self, interval: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Backoff schedule and ceiling for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// First wait; every later wait is double the previous one.
    pub base_interval: Duration,
    /// Upper bound on the summed backoff sleeps. Time spent inside each poll
    /// request is not counted.
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(120),
        }
    }
}

/// A finished job and what it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub job_id: String,
    pub result: ResultSet,
    /// Status checks issued after submission.
    pub polls: u32,
    pub waited: Duration,
}

/// Submit `spec` and block until the job completes, fails, or times out.
pub fn run_query_job<E, S>(
    engine: &E,
    spec: &QuerySpec,
    policy: &PollPolicy,
    sleeper: &S,
) -> Result<CompletedJob, PipelineError>
where
    E: QueryEngine + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut handle = engine.submit(spec)?;
    info!(job_id = %handle.job_id, complete = handle.complete, "query job submitted");

    let mut interval = policy.base_interval;
    let mut waited = Duration::ZERO;
    let mut polls = 0u32;

    while !handle.complete {
        // An unrepresentable total is past any ceiling.
        let fits = waited
            .checked_add(interval)
            .is_some_and(|total| total <= policy.max_wait);
        if !fits {
            return Err(PipelineError::Timeout {
                job_id: handle.job_id,
                polls,
                waited_ms: waited.as_millis(),
            });
        }

        sleeper.sleep(interval);
        waited = waited.saturating_add(interval);

        handle = engine.poll(&handle)?;
        polls += 1;
        debug!(
            job_id = %handle.job_id,
            poll = polls,
            waited_ms = waited.as_millis() as u64,
            complete = handle.complete,
            "polled query job"
        );

        interval = interval.saturating_mul(2);
    }

    match handle.outcome {
        Some(JobOutcome::Failed(message)) => Err(PipelineError::RemoteJob {
            job_id: handle.job_id,
            message,
        }),
        Some(JobOutcome::Rows(result)) => Ok(CompletedJob {
            job_id: handle.job_id,
            result,
            polls,
            waited,
        }),
        // Complete with no payload: the engine omits `rows` for empty results.
        None => Ok(CompletedJob {
            job_id: handle.job_id,
            result: ResultSet::empty(),
            polls,
            waited,
        }),
    }
}
