//! Job definitions and the executor contract.
//!
//! A [`Job`] pairs a name and its declared parameter names with a [`JobExecutor`]. Executors
//! receive the (possibly inherited) context, the resolved arguments and a [`JobLog`] sink, and
//! return a [`JobOutcome`] whose [`StepDirective`] tells the line whether to keep going.

use std::{fmt, sync::Arc};

use anyhow::Result;
use jobline_types::{ArgMap, Context};
use serde_json::Value;

/// Executes the work of a single job.
///
/// Returning an error (or panicking) marks the job journal as `exception`; the error never
/// escapes the engine.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, context: &mut Context, args: &ArgMap, log: &mut JobLog) -> Result<JobOutcome>;
}

/// Whether the enclosing line continues after a successful job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepDirective {
    #[default]
    Continue,
    /// Stop the line after this step even though it succeeded.
    StopLine,
}

/// Successful result of a job execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobOutcome {
    /// Recorded as the step's output.
    pub output: Value,
    pub directive: StepDirective,
}

impl JobOutcome {
    /// Output that lets the line proceed to the next step.
    pub fn proceed(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
            directive: StepDirective::Continue,
        }
    }

    /// Output that ends the line after this step.
    pub fn stop_line(output: impl Into<Value>) -> Self {
        Self {
            output: output.into(),
            directive: StepDirective::StopLine,
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.directive == StepDirective::StopLine
    }
}

impl From<Value> for JobOutcome {
    fn from(output: Value) -> Self {
        Self::proceed(output)
    }
}

/// Per-job diagnostic sink.
///
/// Every message is emitted as a `tracing` event tagged with the job name and kept so it can be
/// copied into the job journal.
#[derive(Debug, Clone, Default)]
pub struct JobLog {
    job: String,
    lines: Vec<String>,
}

impl JobLog {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            lines: Vec::new(),
        }
    }

    pub fn debug(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::debug!(job = %self.job, "{message}");
        self.lines.push(message);
    }

    pub fn info(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::info!(job = %self.job, "{message}");
        self.lines.push(message);
    }

    pub fn warn(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::warn!(job = %self.job, "{message}");
        self.lines.push(message);
    }

    pub fn error(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::error!(job = %self.job, "{message}");
        self.lines.push(message);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Adapts a synchronous closure into a [`JobExecutor`].
pub struct FnExecutor<F> {
    function: F,
}

#[async_trait::async_trait]
impl<F> JobExecutor for FnExecutor<F>
where
    F: Fn(&mut Context, &ArgMap, &mut JobLog) -> Result<JobOutcome> + Send + Sync,
{
    async fn execute(&self, context: &mut Context, args: &ArgMap, log: &mut JobLog) -> Result<JobOutcome> {
        (self.function)(context, args, log)
    }
}

/// Atomic, named unit of work.
#[derive(Clone)]
pub struct Job {
    /// Unique name within a job registry.
    pub name: String,
    /// Optional short human-readable label.
    pub label: Option<String>,
    pub description: Option<String>,
    /// Parameter names the executor expects, in declaration order.
    pub formal_args: Vec<String>,
    executor: Arc<dyn JobExecutor>,
}

impl Job {
    pub fn new<I, S>(name: impl Into<String>, formal_args: I, executor: impl JobExecutor + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            label: None,
            description: None,
            formal_args: formal_args.into_iter().map(Into::into).collect(),
            executor: Arc::new(executor),
        }
    }

    /// Builds a job from a synchronous closure.
    pub fn from_fn<I, S, F>(name: impl Into<String>, formal_args: I, function: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut Context, &ArgMap, &mut JobLog) -> Result<JobOutcome> + Send + Sync + 'static,
    {
        Self::new(name, formal_args, FnExecutor { function })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn executor(&self) -> &dyn JobExecutor {
        self.executor.as_ref()
    }

    /// Label if present, otherwise the name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("description", &self.description)
            .field("formal_args", &self.formal_args)
            .finish_non_exhaustive()
    }
}
