//! Execution engine: runs single jobs and whole job lines.
//!
//! - `step_once::JobRunner` executes one job and captures its journal
//! - `runner::JobLineRunner` resolves arguments and drives a line step by step
//! - [`ExecuteOptions`] carries the caller's external arguments and an optional journal to resume

use jobline_types::{ArgMap, JobLineJournal};

pub mod runner;
pub mod step_once;

pub use runner::JobLineRunner;
pub use step_once::{JobRun, JobRunner};

/// Caller-supplied inputs for one line execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// External arguments; only those the line declares as required are kept.
    pub args: ArgMap,
    /// Journal of a previous attempt used as the resumption reference.
    pub previous_journal: Option<JobLineJournal>,
}

impl ExecuteOptions {
    pub fn new(args: ArgMap) -> Self {
        Self {
            args,
            previous_journal: None,
        }
    }

    /// Adds or replaces one external argument.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Resumes from the journal of a previous attempt.
    pub fn resume_from(mut self, journal: JobLineJournal) -> Self {
        self.previous_journal = Some(journal);
        self
    }
}
