//! Job line orchestration.
//!
//! Walks a line's steps strictly in order: each step's arguments are resolved against the run so
//! far, its job is executed once, and the resulting journal is appended to the line journal. The
//! loop ends early when a step fails, when a step asks the line to stop, or when the resumption
//! journal already holds a completed entry at the current index.

use chrono::Utc;
use jobline_types::{ArgMap, Context, JobLine, JobLineJournal, JournalStatus};
use tracing::{debug, info, warn};

use crate::{
    error::{EngineError, Result},
    registry::{LineRef, Registry},
    resolve::{ArgumentResolver, ResolutionContext},
};

use super::{ExecuteOptions, JobRunner};

/// Executes job lines against a [`Registry`].
pub struct JobLineRunner<'registry> {
    registry: &'registry Registry,
}

impl<'registry> JobLineRunner<'registry> {
    pub fn new(registry: &'registry Registry) -> Self {
        Self { registry }
    }

    /// Runs (or resumes) a job line and returns its journal.
    ///
    /// Structural problems (unknown line, missing required arguments, unknown job) are returned
    /// as [`EngineError`]s. Job failures are not errors: they end the line with status
    /// `exception` and are visible in the returned journal.
    ///
    /// When `options.previous_journal` holds an entry with status `done` at the index about to
    /// run, the line stops there without executing any further step.
    pub async fn execute<'a>(&self, line: impl Into<LineRef<'a>>, options: ExecuteOptions) -> Result<JobLineJournal>
    where
        'registry: 'a,
    {
        let registry: &'a Registry = self.registry;
        let line = registry.resolve_line(line.into()).inspect_err(|error| warn!(%error, "cannot execute job line"))?;
        let external_args = validate_external_args(line, &options.args)?;

        let mut journal = JobLineJournal::pending(&line.name, external_args.clone());
        journal.started_at = Some(Utc::now());
        let reference = options
            .previous_journal
            .unwrap_or_else(|| JobLineJournal::pending(&line.name, external_args));

        info!(line = %line.name, steps = line.steps.len(), resumed = !reference.steps.is_empty(), "executing job line");

        let mut context: Option<Context> = None;
        for (index, step) in line.steps.iter().enumerate() {
            let prior = reference.step(index);
            if prior.is_some_and(|prior| prior.status == JournalStatus::Done) {
                warn!(line = %line.name, index, job = %step.job, "step already done in previous journal; stopping line");
                break;
            }

            let job = registry.jobs.get(&step.job).ok_or_else(|| EngineError::JobNotFound {
                line: line.name.clone(),
                job: step.job.clone(),
                index,
            })?;

            let args = ArgumentResolver::new(ResolutionContext {
                external_args: Some(&journal.input),
                previous_step_output: journal.steps.last().map(|previous| &previous.output),
                current_run_steps: &journal.steps,
                current_index: index,
            })
            .resolve(&step.args, &job.formal_args);
            debug!(line = %line.name, index, job = %job.name, args = ?args.keys().collect::<Vec<_>>(), "resolved step arguments");

            let step_context = if step.inherit_context { context.take() } else { None };
            let run = JobRunner::new(job).run_once(step_context, args, prior).await;

            let status = run.journal.status;
            let stop_requested = run.stop_requested;
            context = Some(run.context);
            journal.steps.push(run.journal);

            if status != JournalStatus::Done {
                warn!(line = %line.name, index, job = %job.name, ?status, "step did not complete; stopping line");
                journal.status = status;
                break;
            }
            if stop_requested {
                info!(line = %line.name, index, job = %job.name, "step requested the line to stop");
                break;
            }
        }

        if !journal.status.is_terminal() {
            journal.status = JournalStatus::Done;
        }
        journal.finished_at = Some(Utc::now());

        info!(line = %line.name, status = ?journal.status, executed = journal.steps.len(), "job line finished");
        Ok(journal)
    }
}

/// Checks that every required external argument is present and keeps only those.
fn validate_external_args(line: &JobLine, supplied: &ArgMap) -> Result<ArgMap> {
    let missing: Vec<String> = line
        .required_args
        .iter()
        .filter(|name| !supplied.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!(line = %line.name, ?missing, "missing required arguments");
        return Err(EngineError::MissingArguments {
            line: line.name.clone(),
            missing,
        });
    }

    Ok(line
        .required_args
        .iter()
        .filter_map(|name| supplied.get(name).map(|value| (name.clone(), value.clone())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobline_types::{ArgSpec, JobLineStep};
    use serde_json::{Value, json};

    fn args(value: Value) -> ArgMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn validation_keeps_only_required_arguments() {
        let line = JobLine::new("deploy").require("app");
        let external = validate_external_args(&line, &args(json!({"app": "demo", "extra": 1}))).expect("valid");
        assert_eq!(external, args(json!({"app": "demo"})));
    }

    #[test]
    fn validation_reports_all_missing_names_in_order() {
        let line = JobLine::new("deploy").require("app").require("region").require("tier");
        let error = validate_external_args(&line, &args(json!({"region": "eu"}))).expect_err("missing");
        assert_eq!(
            error,
            EngineError::MissingArguments {
                line: "deploy".into(),
                missing: vec!["app".into(), "tier".into()],
            }
        );
    }

    #[test]
    fn null_counts_as_supplied() {
        let line = JobLine::new("deploy").require("app");
        let external = validate_external_args(&line, &args(json!({"app": null}))).expect("null is defined");
        assert_eq!(external.get("app"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn unknown_job_is_a_typed_error() {
        let registry = Registry::new();
        let line = JobLine::new("adhoc").step(JobLineStep::new("missing").arg("x", ArgSpec::literal(1)));

        let error = JobLineRunner::new(&registry)
            .execute(&line, ExecuteOptions::default())
            .await
            .expect_err("job not found");

        assert_eq!(
            error,
            EngineError::JobNotFound {
                line: "adhoc".into(),
                job: "missing".into(),
                index: 0,
            }
        );
    }

    #[tokio::test]
    async fn empty_line_completes_done() {
        let registry = Registry::new();
        let line = JobLine::new("empty");

        let journal = JobLineRunner::new(&registry).execute(&line, ExecuteOptions::default()).await.expect("execute");

        assert_eq!(journal.status, JournalStatus::Done);
        assert!(journal.steps.is_empty());
        assert!(journal.finished_at.is_some());
    }
}
