//! Job line definitions shared by the engine and the CLI.
//!
//! A job line is a named, strictly ordered sequence of steps. Each step references a registered
//! job by name and declares how that job's parameters are bound. The models keep authoring order
//! (via `IndexMap`) so argument specs resolve in the order they were written.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// String-keyed value bag used for job arguments and external line arguments.
pub type ArgMap = serde_json::Map<String, JsonValue>;

/// Mutable, free-form execution context optionally threaded between steps.
pub type Context = serde_json::Map<String, JsonValue>;

/// Named linear pipeline of job invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobLine {
    /// Unique name within a line registry.
    pub name: String,
    /// External argument names the caller must supply.
    #[serde(default, alias = "required_external_args")]
    pub required_args: Vec<String>,
    /// Ordered steps executed one after another.
    #[serde(default)]
    pub steps: Vec<JobLineStep>,
}

impl JobLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_args: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Declares an external argument the caller must supply.
    pub fn require(mut self, argument: impl Into<String>) -> Self {
        self.required_args.push(argument.into());
        self
    }

    /// Appends a step to the end of the line.
    pub fn step(mut self, step: JobLineStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// One invocation of a registered job inside a line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobLineStep {
    /// Name of the job to run.
    #[serde(alias = "job_name")]
    pub job: String,
    /// When false the job starts from an empty context instead of the previous step's.
    #[serde(default = "default_inherit_context")]
    pub inherit_context: bool,
    /// Argument bindings keyed by target parameter name.
    #[serde(default)]
    pub args: IndexMap<String, ArgSpec>,
}

impl JobLineStep {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            inherit_context: true,
            args: IndexMap::new(),
        }
    }

    /// Binds a parameter of the job to the given source.
    pub fn arg(mut self, parameter: impl Into<String>, spec: ArgSpec) -> Self {
        self.args.insert(parameter.into(), spec);
        self
    }

    /// Starts the job from a fresh context rather than the previous step's.
    pub fn isolated(mut self) -> Self {
        self.inherit_context = false;
        self
    }
}

fn default_inherit_context() -> bool {
    true
}

/// Source of a single job parameter value.
///
/// Written as a single-key map naming the source, e.g. `{ from_external: app }` or
/// `{ from_step_at: { index: -1, key: image } }`. The map form is read the same way from any
/// self-describing format, so YAML and JSON documents share one shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", try_from = "ArgSpecRecord")]
pub enum ArgSpec {
    /// Constant value.
    Literal(JsonValue),
    /// Value of a caller-supplied external argument.
    FromExternal(String),
    /// Field of the immediately preceding executed step's output.
    FromPreviousStep(String),
    /// Field of the output recorded at a step index; negative indexes count back from the current step.
    FromStepAt { index: i64, key: String },
}

impl ArgSpec {
    pub fn literal(value: impl Into<JsonValue>) -> Self {
        Self::Literal(value.into())
    }

    pub fn from_external(key: impl Into<String>) -> Self {
        Self::FromExternal(key.into())
    }

    pub fn from_previous_step(key: impl Into<String>) -> Self {
        Self::FromPreviousStep(key.into())
    }

    pub fn from_step_at(index: i64, key: impl Into<String>) -> Self {
        Self::FromStepAt { index, key: key.into() }
    }
}

/// Map form of an [`ArgSpec`] as authored; exactly one field must be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArgSpecRecord {
    #[serde(default, deserialize_with = "deserialize_present")]
    literal: Option<JsonValue>,
    #[serde(default)]
    from_external: Option<String>,
    #[serde(default)]
    from_previous_step: Option<String>,
    #[serde(default)]
    from_step_at: Option<StepAtRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepAtRecord {
    index: i64,
    key: String,
}

/// Keeps an explicit `null` literal distinct from an absent field.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

impl TryFrom<ArgSpecRecord> for ArgSpec {
    type Error = String;

    fn try_from(record: ArgSpecRecord) -> Result<Self, Self::Error> {
        let mut specs = Vec::with_capacity(1);
        if let Some(value) = record.literal {
            specs.push(ArgSpec::Literal(value));
        }
        if let Some(key) = record.from_external {
            specs.push(ArgSpec::FromExternal(key));
        }
        if let Some(key) = record.from_previous_step {
            specs.push(ArgSpec::FromPreviousStep(key));
        }
        if let Some(StepAtRecord { index, key }) = record.from_step_at {
            specs.push(ArgSpec::FromStepAt { index, key });
        }

        match specs.len() {
            1 => Ok(specs.remove(0)),
            count => Err(format!(
                "argument binding must set exactly one of `literal`, `from_external`, `from_previous_step`, `from_step_at` (found {count})"
            )),
        }
    }
}

/// Authored line definition as it appears in a document, keyed externally by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobLineDefinition {
    /// Optional explicit name; the document key is used when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional descriptive copy.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "required_external_args")]
    pub required_args: Vec<String>,
    #[serde(default)]
    pub steps: Vec<JobLineStep>,
}

impl JobLineDefinition {
    /// Builds the runtime line, preferring the explicit name over the document key.
    pub fn into_line(self, key: &str) -> JobLine {
        JobLine {
            name: self.name.unwrap_or_else(|| key.to_string()),
            required_args: self.required_args,
            steps: self.steps,
        }
    }
}

/// A file of job line definitions keyed by line name, preserving authoring order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobLineDocument {
    #[serde(default)]
    pub lines: IndexMap<String, JobLineDefinition>,
}
