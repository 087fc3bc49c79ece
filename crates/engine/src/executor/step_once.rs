//! Single-job execution.
//!
//! Runs a job's executor exactly once, owning the job journal and the context for the duration
//! of the call. Failures (returned errors and panics alike) are captured into the journal as
//! `exception`; nothing propagates to the caller.

use std::{any::Any, panic::AssertUnwindSafe};

use chrono::Utc;
use futures_util::FutureExt;
use jobline_types::{ArgMap, Context, JobJournal, JournalStatus};
use serde_json::Value;
use tracing::{debug, error};

use crate::job::{Job, JobLog};

/// Result of running a job once.
#[derive(Debug, Clone)]
pub struct JobRun {
    /// Context after the executor ran, possibly mutated by it.
    pub context: Context,
    pub journal: JobJournal,
    /// Value returned by the executor; `None` when it failed.
    pub output: Option<Value>,
    /// Whether the executor asked the line to stop after this step.
    pub stop_requested: bool,
}

impl JobRun {
    pub fn status(&self) -> JournalStatus {
        self.journal.status
    }
}

/// Executes one job invocation.
pub struct JobRunner<'job> {
    job: &'job Job,
}

impl<'job> JobRunner<'job> {
    pub fn new(job: &'job Job) -> Self {
        Self { job }
    }

    /// Runs the job with `args`.
    ///
    /// Starts from a copy of `prior_journal` when given, else from a fresh pending journal. The
    /// copy keeps the prior `output` (so it survives a failure) and `logs` (new lines are
    /// appended), but its `input` is replaced with `args` and any earlier `error` is cleared, so
    /// the journal always describes the attempt that just ran. A missing `context` starts as an
    /// empty map.
    pub async fn run_once(&self, context: Option<Context>, args: ArgMap, prior_journal: Option<&JobJournal>) -> JobRun {
        let mut journal = match prior_journal {
            Some(prior) => {
                let mut journal = prior.clone();
                journal.input = args.clone();
                journal.error = None;
                journal
            }
            None => JobJournal::pending(&self.job.name, args.clone()),
        };
        let mut context = context.unwrap_or_default();
        let mut log = JobLog::new(&self.job.name);

        debug!(job = %self.job.name, resumed = prior_journal.is_some(), "running job");
        journal.started_at = Some(Utc::now());

        let execution = AssertUnwindSafe(self.job.executor().execute(&mut context, &args, &mut log))
            .catch_unwind()
            .await;

        let (output, stop_requested) = match execution {
            Ok(Ok(outcome)) => {
                let stop_requested = outcome.stop_requested();
                journal.output = outcome.output.clone();
                journal.status = JournalStatus::Done;
                (Some(outcome.output), stop_requested)
            }
            Ok(Err(failure)) => {
                let message = format!("{failure:#}");
                error!(job = %self.job.name, error = %message, "job failed");
                log.error(format!("job '{}' failed: {message}", self.job.name));
                journal.status = JournalStatus::Exception;
                journal.error = Some(message);
                (None, false)
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(job = %self.job.name, panic = %message, "job panicked");
                log.error(format!("job '{}' panicked: {message}", self.job.name));
                journal.status = JournalStatus::Exception;
                journal.error = Some(message);
                (None, false)
            }
        };

        journal.finished_at = Some(Utc::now());
        journal.logs.extend(log.into_lines());

        JobRun {
            context,
            journal,
            output,
            stop_requested,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "job panicked".to_string()
    }
}
