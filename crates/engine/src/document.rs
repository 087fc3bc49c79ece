//! Conversion of authored line documents into runtime job lines.
//!
//! Documents keep authoring order, so lines are registered in the order they were written. This
//! module normalizes names and rejects definitions the registry could not accept.

use anyhow::{Context, Result, bail};
use jobline_types::{JobLine, JobLineDefinition, JobLineDocument};

use crate::registry::Registry;

/// Builds a runtime line from a document entry keyed by `key`.
pub fn job_line_from_definition(key: &str, definition: JobLineDefinition) -> Result<JobLine> {
    let mut line = definition.into_line(key);
    line.name = line.name.trim().to_string();

    if line.name.is_empty() {
        bail!("job line definition is missing a name");
    }
    if let Some(index) = line.steps.iter().position(|step| step.job.trim().is_empty()) {
        bail!("step {index} of job line '{}' does not name a job", line.name);
    }

    Ok(line)
}

/// Builds every line of a document, in authoring order.
pub fn build_job_lines(document: JobLineDocument) -> Result<Vec<JobLine>> {
    let mut lines: Vec<JobLine> = Vec::with_capacity(document.lines.len());

    for (key, definition) in document.lines {
        let line = job_line_from_definition(&key, definition).with_context(|| format!("failed to load job line '{key}'"))?;
        if lines.iter().any(|existing| existing.name == line.name) {
            bail!("duplicate job line name detected: '{}'", line.name);
        }
        lines.push(line);
    }

    Ok(lines)
}

/// Registers every line of a document and returns how many were added.
pub fn register_document(registry: &mut Registry, document: JobLineDocument) -> Result<usize> {
    let lines = build_job_lines(document)?;
    let count = lines.len();
    for line in lines {
        registry.register_job_line(line)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;
    use jobline_types::JobLineStep;

    #[test]
    fn rejects_blank_names() {
        let definition = JobLineDefinition {
            name: Some("   ".into()),
            ..Default::default()
        };
        let error = job_line_from_definition("ignored", definition).expect_err("expected name error");
        assert!(error.to_string().contains("missing a name"));
    }

    #[test]
    fn rejects_steps_without_job() {
        let definition = JobLineDefinition {
            steps: vec![JobLineStep::new("build"), JobLineStep::new("")],
            ..Default::default()
        };
        let error = job_line_from_definition("deploy", definition).expect_err("expected job error");
        assert!(error.to_string().contains("step 1 of job line 'deploy'"));
    }

    #[test]
    fn rejects_duplicate_names_after_normalization() {
        let document = JobLineDocument {
            lines: indexmap! {
                "deploy".to_string() => JobLineDefinition::default(),
                "other".to_string() => JobLineDefinition { name: Some("deploy ".into()), ..Default::default() },
            },
        };
        let error = build_job_lines(document).expect_err("duplicate");
        assert!(error.to_string().contains("duplicate job line name"));
    }

    #[test]
    fn registers_lines_in_order() {
        let document = JobLineDocument {
            lines: indexmap! {
                "b".to_string() => JobLineDefinition::default(),
                "a".to_string() => JobLineDefinition::default(),
            },
        };
        let mut registry = Registry::new();
        assert_eq!(register_document(&mut registry, document).expect("register"), 2);
        let names: Vec<_> = registry.lines.iter().map(|line| line.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_against_existing_registry_fails() {
        let mut registry = Registry::new();
        registry.register_job_line(JobLine::new("deploy")).unwrap();
        let document = JobLineDocument {
            lines: indexmap! { "deploy".to_string() => JobLineDefinition::default() },
        };
        let error = register_document(&mut registry, document).expect_err("duplicate");
        assert!(error.to_string().contains("already registered"));
    }
}
