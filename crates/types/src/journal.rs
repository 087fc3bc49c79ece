//! Execution journals recorded for jobs and job lines.
//!
//! Journals are plain data: the engine builds them during a run and hands them to the caller,
//! who may persist them and pass a line journal back in to resume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::line::ArgMap;

/// Lifecycle status shared by job and line journals.
///
/// `Pending` is the only non-terminal state; once `Exception` or `Done` is set the journal is final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    #[default]
    Pending,
    Exception,
    Done,
}

impl JournalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JournalStatus::Pending)
    }
}

/// Record of one job execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobJournal {
    /// Name of the job that ran.
    #[serde(alias = "name")]
    pub job_name: String,
    /// Arguments the job was invoked with.
    #[serde(default)]
    pub input: ArgMap,
    /// Value returned by the job's executor; `null` until the job completes.
    #[serde(default)]
    pub output: JsonValue,
    #[serde(default)]
    pub status: JournalStatus,
    /// Failure message when `status` is `exception`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Lines written to the job's log sink.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobJournal {
    /// Fresh pending journal for a job about to run with `input`.
    pub fn pending(job_name: impl Into<String>, input: ArgMap) -> Self {
        Self {
            job_name: job_name.into(),
            input,
            output: JsonValue::Null,
            status: JournalStatus::Pending,
            error: None,
            logs: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// The recorded output, treating `null` as absent.
    pub fn output(&self) -> Option<&JsonValue> {
        match &self.output {
            JsonValue::Null => None,
            value => Some(value),
        }
    }
}

/// Record of one job line execution attempt, index-aligned with the line's steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobLineJournal {
    /// Name of the line that ran.
    #[serde(alias = "name")]
    pub line_name: String,
    /// External arguments accepted for the run.
    #[serde(default)]
    pub input: ArgMap,
    #[serde(default)]
    pub status: JournalStatus,
    /// One journal per executed step; shorter than the line when execution stopped early.
    #[serde(default)]
    pub steps: Vec<JobJournal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobLineJournal {
    pub fn pending(line_name: impl Into<String>, input: ArgMap) -> Self {
        Self {
            line_name: line_name.into(),
            input,
            status: JournalStatus::Pending,
            steps: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Journal recorded at `index`, if that step ran.
    pub fn step(&self, index: usize) -> Option<&JobJournal> {
        self.steps.get(index)
    }

    /// Output of the most recently executed step.
    pub fn last_output(&self) -> Option<&JsonValue> {
        self.steps.last().and_then(JobJournal::output)
    }
}
