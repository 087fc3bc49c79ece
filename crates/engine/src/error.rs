//! Error types surfaced by registration and line execution.
//!
//! Job-level failures never appear here; they are recorded in the job journal instead.

use thiserror::Error;

/// Which registry rejected a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Job,
    JobLine,
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryKind::Job => f.write_str("job"),
            RegistryKind::JobLine => f.write_str("job line"),
        }
    }
}

/// Structural failures of the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{kind} '{name}' is already registered")]
    DuplicateName { kind: RegistryKind, name: String },

    #[error("job line not found: {name}")]
    JobLineNotFound { name: String },

    #[error("job line '{line}' is missing required arguments: {}", .missing.join(", "))]
    MissingArguments { line: String, missing: Vec<String> },

    #[error("job '{job}' referenced by step {index} of job line '{line}' is not registered")]
    JobNotFound { line: String, job: String, index: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_arguments_lists_every_name() {
        let error = EngineError::MissingArguments {
            line: "deploy".into(),
            missing: vec!["app".into(), "region".into()],
        };
        assert_eq!(error.to_string(), "job line 'deploy' is missing required arguments: app, region");
    }

    #[test]
    fn duplicate_name_mentions_registry() {
        let error = EngineError::DuplicateName {
            kind: RegistryKind::JobLine,
            name: "deploy".into(),
        };
        assert_eq!(error.to_string(), "job line 'deploy' is already registered");
    }
}
