//! Name-keyed registries for jobs and job lines.
//!
//! Registries are insert-only: once a name is taken it stays bound to the first item for the
//! registry's lifetime. A [`Registry`] bundles both and is the entry point for executing lines.

use indexmap::{IndexMap, map::Entry};
use jobline_types::{JobLine, JobLineJournal};
use tracing::debug;

use crate::{
    error::{EngineError, RegistryKind, Result},
    executor::{ExecuteOptions, JobLineRunner},
    job::Job,
};

/// Insert-only store of [`Job`] definitions.
#[derive(Debug, Default, Clone)]
pub struct JobRegistry {
    jobs: IndexMap<String, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job. `None` is accepted and ignored.
    pub fn register(&mut self, job: impl Into<Option<Job>>) -> Result<()> {
        let Some(job) = job.into() else {
            return Ok(());
        };
        match self.jobs.entry(job.name.clone()) {
            Entry::Occupied(entry) => Err(EngineError::DuplicateName {
                kind: RegistryKind::Job,
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(job = %job.name, formal_args = ?job.formal_args, "registered job");
                entry.insert(job);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }
}

/// Insert-only store of [`JobLine`] definitions.
#[derive(Debug, Default, Clone)]
pub struct JobLineRegistry {
    lines: IndexMap<String, JobLine>,
}

impl JobLineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a line. `None` is accepted and ignored.
    pub fn register(&mut self, line: impl Into<Option<JobLine>>) -> Result<()> {
        let Some(line) = line.into() else {
            return Ok(());
        };
        match self.lines.entry(line.name.clone()) {
            Entry::Occupied(entry) => Err(EngineError::DuplicateName {
                kind: RegistryKind::JobLine,
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(line = %line.name, steps = line.steps.len(), "registered job line");
                entry.insert(line);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&JobLine> {
        self.lines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobLine> {
        self.lines.values()
    }
}

/// Reference to the line to execute: a registered name or a line definition held by the caller.
#[derive(Debug, Clone, Copy)]
pub enum LineRef<'a> {
    Name(&'a str),
    Line(&'a JobLine),
}

impl<'a> From<&'a str> for LineRef<'a> {
    fn from(name: &'a str) -> Self {
        LineRef::Name(name)
    }
}

impl<'a> From<&'a String> for LineRef<'a> {
    fn from(name: &'a String) -> Self {
        LineRef::Name(name.as_str())
    }
}

impl<'a> From<&'a JobLine> for LineRef<'a> {
    fn from(line: &'a JobLine) -> Self {
        LineRef::Line(line)
    }
}

/// Job and job line registries constructed by the caller.
///
/// Populate it during setup, then execute lines against it; execution never mutates it.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    pub jobs: JobRegistry,
    pub lines: JobLineRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_job(&mut self, job: impl Into<Option<Job>>) -> Result<()> {
        self.jobs.register(job)
    }

    pub fn register_job_line(&mut self, line: impl Into<Option<JobLine>>) -> Result<()> {
        self.lines.register(line)
    }

    /// Looks up the line a [`LineRef`] points at.
    pub fn resolve_line<'a>(&'a self, line: LineRef<'a>) -> Result<&'a JobLine> {
        match line {
            LineRef::Line(line) => Ok(line),
            LineRef::Name(name) => self.lines.get(name).ok_or_else(|| EngineError::JobLineNotFound { name: name.to_string() }),
        }
    }

    /// Runs (or resumes) a job line. See [`JobLineRunner::execute`].
    pub async fn execute_job_line<'a>(&'a self, line: impl Into<LineRef<'a>>, options: ExecuteOptions) -> Result<JobLineJournal> {
        JobLineRunner::new(self).execute(line, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobOutcome;
    use jobline_types::JobLineStep;
    use serde_json::json;

    fn constant_job(name: &str, value: i64) -> Job {
        Job::from_fn(name, Vec::<String>::new(), move |_, _, _| Ok(JobOutcome::proceed(json!(value))))
    }

    #[test]
    fn duplicate_job_is_rejected_and_first_is_kept() {
        let mut registry = Registry::new();
        registry.register_job(constant_job("build", 1)).expect("first registration");

        let error = registry.register_job(constant_job("build", 2).with_label("second")).expect_err("duplicate");

        assert_eq!(
            error,
            EngineError::DuplicateName {
                kind: RegistryKind::Job,
                name: "build".into()
            }
        );
        assert_eq!(registry.jobs.len(), 1);
        assert!(registry.jobs.get("build").expect("still registered").label.is_none());
    }

    #[test]
    fn duplicate_line_is_rejected_and_first_is_kept() {
        let mut registry = Registry::new();
        registry
            .register_job_line(JobLine::new("deploy").step(JobLineStep::new("build")))
            .expect("first registration");

        let error = registry.register_job_line(JobLine::new("deploy")).expect_err("duplicate");

        assert!(matches!(error, EngineError::DuplicateName { kind: RegistryKind::JobLine, .. }));
        assert_eq!(registry.lines.get("deploy").expect("still registered").steps.len(), 1);
    }

    #[test]
    fn none_registration_is_a_no_op() {
        let mut registry = Registry::new();
        registry.register_job(None::<Job>).expect("none job");
        registry.register_job_line(None::<JobLine>).expect("none line");
        assert!(registry.jobs.is_empty());
        assert!(registry.lines.is_empty());
    }

    #[test]
    fn resolve_line_by_name_or_reference() {
        let mut registry = Registry::new();
        registry.register_job_line(JobLine::new("deploy")).unwrap();

        assert_eq!(registry.resolve_line("deploy".into()).unwrap().name, "deploy");
        let adhoc = JobLine::new("adhoc");
        assert_eq!(registry.resolve_line((&adhoc).into()).unwrap().name, "adhoc");
        assert_eq!(
            registry.resolve_line("missing".into()).unwrap_err(),
            EngineError::JobLineNotFound { name: "missing".into() }
        );
    }

    #[test]
    fn iterates_in_registration_order() {
        let mut registry = JobRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(constant_job(name, 0)).unwrap();
        }
        let names: Vec<_> = registry.iter().map(|job| job.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert!(registry.contains("a"));
    }
}
