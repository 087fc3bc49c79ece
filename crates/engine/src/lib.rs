//! # Jobline Engine
//!
//! The Jobline Engine registers jobs and job lines, then executes lines step by step while
//! recording a journal of every job invocation. Journals can be handed back in to resume a
//! previous attempt.
//!
//! ## Key Features
//!
//! - **Registries**: Insert-only, name-keyed stores for jobs and lines owned by the caller
//! - **Argument Binding**: Literal, external, previous-step and indexed-step sources with a
//!   same-name fallback to external arguments
//! - **Context Threading**: A mutable context optionally flows from one step to the next
//! - **Journals**: Per-step input, output and status, serializable for later inspection
//!
//! ## Usage
//!
//! ```rust
//! use jobline_engine::{ArgSpec, ExecuteOptions, Job, JobLine, JobLineStep, JobOutcome, JournalStatus, Registry};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut registry = Registry::new();
//! registry.register_job(Job::from_fn("greet", ["name"], |_, args, _| {
//!     Ok(JobOutcome::proceed(json!({ "greeting": format!("hello {}", args["name"].as_str().unwrap_or_default()) })))
//! }))?;
//! registry.register_job_line(
//!     JobLine::new("welcome")
//!         .require("user")
//!         .step(JobLineStep::new("greet").arg("name", ArgSpec::from_external("user"))),
//! )?;
//!
//! let journal = registry
//!     .execute_job_line("welcome", ExecuteOptions::default().arg("user", "ada"))
//!     .await?;
//! assert_eq!(journal.status, JournalStatus::Done);
//! assert_eq!(journal.steps[0].output, json!({ "greeting": "hello ada" }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`registry`**: Job and job line registries plus the [`Registry`] entry point
//! - **`resolve`**: Argument resolution for a single step
//! - **`executor`**: Single-job runner and the line orchestrator
//! - **`document`**: Loading job lines from YAML/JSON documents

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

pub mod document;
pub mod error;
pub mod executor;
pub mod job;
pub mod registry;
pub mod resolve;

pub use error::{EngineError, RegistryKind};
pub use executor::{ExecuteOptions, JobLineRunner, JobRun, JobRunner};
pub use job::{FnExecutor, Job, JobExecutor, JobLog, JobOutcome, StepDirective};
pub use jobline_types::{
    ArgMap, ArgSpec, Context as JobContext, JobJournal, JobLine, JobLineDefinition, JobLineDocument, JobLineJournal, JobLineStep,
    JournalStatus,
};
pub use registry::{JobLineRegistry, JobRegistry, LineRef, Registry};
pub use resolve::{ArgumentResolver, ResolutionContext};

/// Loads job line definitions from a YAML or JSON file.
///
/// Accepts either a multi-line document with definitions under a `lines` key, or a single line
/// with `name`, `required_args` and `steps` at the top level. JSON is valid YAML, so one parser
/// handles both.
///
/// # Errors
///
/// Returns an error if the file cannot be read or matches neither document shape.
///
/// # Examples
///
/// ```rust
/// use jobline_engine::parse_job_line_file;
///
/// let temp_dir = tempfile::tempdir()?;
/// let path = temp_dir.path().join("lines.yaml");
/// std::fs::write(&path, r#"
/// lines:
///   deploy:
///     required_args: [app]
///     steps:
///       - job: build
///         args:
///           app: { from_external: app }
/// "#)?;
///
/// let document = parse_job_line_file(&path)?;
/// assert_eq!(document.lines.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_job_line_file(file_path: impl AsRef<Path>) -> Result<JobLineDocument> {
    let file_path = file_path.as_ref();
    let file_content = fs::read(file_path).with_context(|| format!("Failed to read job line file: {}", file_path.display()))?;

    let content_string = String::from_utf8_lossy(&file_content);
    parse_job_line_str(&content_string).with_context(|| format!("Failed to parse job line file: {}", file_path.display()))
}

/// Parses job line definitions from YAML or JSON text. See [`parse_job_line_file`].
///
/// The document shape is picked from its top-level keys (`lines` for a multi-line document,
/// `name` for a single line), so a malformed step reports the underlying parse error with its
/// location instead of a generic format message.
pub fn parse_job_line_str(content: &str) -> Result<JobLineDocument> {
    #[derive(Deserialize)]
    struct MultiLineDocument {
        lines: IndexMap<String, JobLineDefinition>,
    }

    let shape: serde_yaml::Value = serde_yaml::from_str(content).context("Job line document is not valid YAML or JSON")?;

    if shape.get("lines").is_some() {
        let multi_line_document: MultiLineDocument = serde_yaml::from_str(content).context("Invalid multi-line job line document")?;
        return Ok(JobLineDocument {
            lines: multi_line_document.lines,
        });
    }

    if shape.get("name").is_some() {
        let line: JobLine = serde_yaml::from_str(content).context("Invalid job line document")?;
        let mut lines = IndexMap::new();
        lines.insert(
            line.name.clone(),
            JobLineDefinition {
                name: Some(line.name),
                description: None,
                required_args: line.required_args,
                steps: line.steps,
            },
        );
        return Ok(JobLineDocument { lines });
    }

    anyhow::bail!(
        "Unsupported job line document format. Expected one of:\n\
         - Single job line with 'name', 'required_args', and 'steps' fields\n\
         - Multi-line document with job lines under the 'lines' key\n\
         "
    );
}
