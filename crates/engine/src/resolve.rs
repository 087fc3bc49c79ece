//! Argument resolution for a single step.
//!
//! Each step binds job parameters through [`ArgSpec`]s. The resolver evaluates those bindings
//! against the current run (external arguments, the previous step's output and the journals
//! recorded so far) and then fills any remaining formal parameter from the external argument of
//! the same name. Resolution is permissive: a binding whose source is unavailable is skipped and
//! the parameter is simply absent from the result.

use indexmap::IndexMap;
use jobline_types::{ArgMap, ArgSpec, JobJournal};
use serde_json::Value;
use tracing::trace;

/// Run state visible to the resolver while preparing one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionContext<'a> {
    /// Validated external arguments of the line.
    pub external_args: Option<&'a ArgMap>,
    /// Output of the immediately preceding executed step.
    pub previous_step_output: Option<&'a Value>,
    /// Journals recorded so far in this run.
    pub current_run_steps: &'a [JobJournal],
    /// Index of the step being prepared.
    pub current_index: usize,
}

/// Outcome of evaluating one binding.
#[derive(Debug, Clone, PartialEq)]
enum Binding {
    /// Source present and the key was found.
    Value(Value),
    /// Source present but without the key; the parameter counts as bound but stays absent.
    Empty,
    /// Source unavailable; the parameter remains open for the same-name fallback.
    Unavailable,
}

impl Binding {
    fn lookup(source: &Value, key: &str) -> Self {
        match source.get(key) {
            Some(value) => Binding::Value(value.clone()),
            None => Binding::Empty,
        }
    }
}

/// Resolves a step's argument specs into the argument map handed to the job.
pub struct ArgumentResolver<'context> {
    context: ResolutionContext<'context>,
}

impl<'context> ArgumentResolver<'context> {
    pub fn new(context: ResolutionContext<'context>) -> Self {
        Self { context }
    }

    /// Builds the job input for `formal_args` from `arg_specs`.
    ///
    /// Specs targeting a name that is not a formal parameter are ignored. Every formal parameter
    /// not bound by a spec falls back to the external argument of the same name when one exists.
    pub fn resolve(&self, arg_specs: &IndexMap<String, ArgSpec>, formal_args: &[String]) -> ArgMap {
        let mut resolved = ArgMap::new();
        let mut bound: Vec<&str> = Vec::new();

        for (parameter, spec) in arg_specs {
            if !formal_args.iter().any(|formal| formal == parameter) {
                trace!(parameter = %parameter, "ignoring binding for undeclared parameter");
                continue;
            }
            match self.resolve_spec(spec) {
                Binding::Value(value) => {
                    resolved.insert(parameter.clone(), value);
                    bound.push(parameter.as_str());
                }
                Binding::Empty => bound.push(parameter.as_str()),
                Binding::Unavailable => {}
            }
        }

        if let Some(external_args) = self.context.external_args {
            for parameter in formal_args {
                if bound.contains(&parameter.as_str()) {
                    continue;
                }
                if let Some(value) = external_args.get(parameter) {
                    resolved.insert(parameter.clone(), value.clone());
                }
            }
        }

        resolved
    }

    fn resolve_spec(&self, spec: &ArgSpec) -> Binding {
        match spec {
            ArgSpec::Literal(value) => Binding::Value(value.clone()),
            ArgSpec::FromExternal(key) => match self.context.external_args {
                Some(external_args) => match external_args.get(key) {
                    Some(value) => Binding::Value(value.clone()),
                    None => Binding::Empty,
                },
                None => Binding::Unavailable,
            },
            ArgSpec::FromPreviousStep(key) => match self.previous_step_output() {
                Some(output) => Binding::lookup(output, key),
                None => Binding::Unavailable,
            },
            ArgSpec::FromStepAt { index, key } => match self.step_output_at(*index) {
                Some(output) => Binding::lookup(output, key),
                None => Binding::Unavailable,
            },
        }
    }

    fn previous_step_output(&self) -> Option<&'context Value> {
        self.context.previous_step_output.filter(|output| !output.is_null())
    }

    /// Output recorded at an absolute index, or relative to the current step when negative.
    fn step_output_at(&self, index: i64) -> Option<&'context Value> {
        let position = if index >= 0 {
            usize::try_from(index).ok()?
        } else {
            let current = i64::try_from(self.context.current_index).ok()?;
            usize::try_from(current.checked_add(index)?).ok()?
        };
        self.context.current_run_steps.get(position).and_then(JobJournal::output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;
    use jobline_types::JournalStatus;
    use serde_json::json;

    fn args(value: Value) -> ArgMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn formal(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn done_journal(job: &str, output: Value) -> JobJournal {
        let mut journal = JobJournal::pending(job, ArgMap::new());
        journal.output = output;
        journal.status = JournalStatus::Done;
        journal
    }

    #[test]
    fn resolves_literal_and_external() {
        let external = args(json!({"foo": 42}));
        let resolver = ArgumentResolver::new(ResolutionContext {
            external_args: Some(&external),
            ..Default::default()
        });

        let specs = indexmap! {
            "a".to_string() => ArgSpec::from_external("foo"),
            "b".to_string() => ArgSpec::literal("fixed"),
        };
        let resolved = resolver.resolve(&specs, &formal(&["a", "b"]));

        assert_eq!(resolved.get("a"), Some(&json!(42)));
        assert_eq!(resolved.get("b"), Some(&json!("fixed")));
    }

    #[test]
    fn falls_back_to_external_argument_with_same_name() {
        let external = args(json!({"a": 1, "b": 7, "c": 9}));
        let resolver = ArgumentResolver::new(ResolutionContext {
            external_args: Some(&external),
            ..Default::default()
        });

        let specs = indexmap! { "a".to_string() => ArgSpec::literal("explicit") };
        let resolved = resolver.resolve(&specs, &formal(&["a", "b"]));

        assert_eq!(resolved, args(json!({"a": "explicit", "b": 7})));
    }

    #[test]
    fn ignores_specs_for_undeclared_parameters() {
        let resolver = ArgumentResolver::new(ResolutionContext::default());
        let specs = indexmap! { "extra".to_string() => ArgSpec::literal(1) };
        assert!(resolver.resolve(&specs, &formal(&["a"])).is_empty());
    }

    #[test]
    fn external_binding_without_external_args_is_skipped() {
        let resolver = ArgumentResolver::new(ResolutionContext::default());
        let specs = indexmap! { "a".to_string() => ArgSpec::from_external("a") };
        assert!(resolver.resolve(&specs, &formal(&["a"])).is_empty());
    }

    #[test]
    fn reads_previous_step_output() {
        let previous = json!({"image": "demo:1"});
        let resolver = ArgumentResolver::new(ResolutionContext {
            previous_step_output: Some(&previous),
            ..Default::default()
        });

        let specs = indexmap! { "image".to_string() => ArgSpec::from_previous_step("image") };
        let resolved = resolver.resolve(&specs, &formal(&["image"]));

        assert_eq!(resolved.get("image"), Some(&json!("demo:1")));
    }

    #[test]
    fn null_previous_output_leaves_parameter_open_for_fallback() {
        let previous = Value::Null;
        let external = args(json!({"image": "external"}));
        let resolver = ArgumentResolver::new(ResolutionContext {
            external_args: Some(&external),
            previous_step_output: Some(&previous),
            ..Default::default()
        });

        let specs = indexmap! { "image".to_string() => ArgSpec::from_previous_step("image") };
        let resolved = resolver.resolve(&specs, &formal(&["image"]));

        assert_eq!(resolved.get("image"), Some(&json!("external")));
    }

    #[test]
    fn missing_key_in_present_source_blocks_fallback() {
        let previous = json!({"other": true});
        let external = args(json!({"image": "external"}));
        let resolver = ArgumentResolver::new(ResolutionContext {
            external_args: Some(&external),
            previous_step_output: Some(&previous),
            ..Default::default()
        });

        let specs = indexmap! { "image".to_string() => ArgSpec::from_previous_step("image") };
        assert!(resolver.resolve(&specs, &formal(&["image"])).is_empty());
    }

    #[test]
    fn relative_step_index_counts_back_from_current() {
        let steps = vec![done_journal("first", json!({"out": 0})), done_journal("second", json!({"out": 1}))];
        let resolver = ArgumentResolver::new(ResolutionContext {
            current_run_steps: &steps,
            current_index: 2,
            ..Default::default()
        });

        let specs = indexmap! {
            "relative".to_string() => ArgSpec::from_step_at(-1, "out"),
            "absolute".to_string() => ArgSpec::from_step_at(0, "out"),
        };
        let resolved = resolver.resolve(&specs, &formal(&["relative", "absolute"]));

        assert_eq!(resolved, args(json!({"relative": 1, "absolute": 0})));
    }

    #[test]
    fn out_of_range_step_index_is_skipped() {
        let steps = vec![done_journal("first", json!({"out": 0}))];
        let external = args(json!({"value": "fallback"}));
        let resolver = ArgumentResolver::new(ResolutionContext {
            external_args: Some(&external),
            current_run_steps: &steps,
            current_index: 1,
            ..Default::default()
        });

        let specs = indexmap! {
            "value".to_string() => ArgSpec::from_step_at(-5, "out"),
            "later".to_string() => ArgSpec::from_step_at(3, "out"),
        };
        let resolved = resolver.resolve(&specs, &formal(&["value", "later"]));

        assert_eq!(resolved, args(json!({"value": "fallback"})));
    }

    #[test]
    fn step_without_output_is_skipped() {
        let steps = vec![JobJournal::pending("first", ArgMap::new())];
        let resolver = ArgumentResolver::new(ResolutionContext {
            current_run_steps: &steps,
            current_index: 1,
            ..Default::default()
        });

        let specs = indexmap! { "value".to_string() => ArgSpec::from_step_at(0, "out") };
        assert!(resolver.resolve(&specs, &formal(&["value"])).is_empty());
    }
}
