//! Built-in jobs available to lines run from the command line.

use std::time::Duration;

use anyhow::{Result, anyhow};
use jobline_engine::{ArgMap, Job, JobContext, JobExecutor, JobLog, JobOutcome, Registry};
use serde_json::{Value, json};

/// Registers every built-in job.
pub fn register_builtin_jobs(registry: &mut Registry) -> Result<()> {
    registry.register_job(
        Job::from_fn("echo", ["message"], |_, args, log| {
            let message = args.get("message").cloned().unwrap_or(Value::Null);
            log.info(format!("echo: {message}"));
            Ok(JobOutcome::proceed(json!({ "message": message })))
        })
        .with_label("Echo message")
        .with_description("Returns its message argument"),
    )?;

    registry.register_job(
        Job::from_fn("context:set", ["key", "value"], |context, args, _| {
            let key = string_arg(args, "key")?;
            let value = args.get("value").cloned().unwrap_or(Value::Null);
            context.insert(key.to_string(), value);
            Ok(JobOutcome::proceed(Value::Object(context.clone())))
        })
        .with_label("Set context value")
        .with_description("Stores a value in the shared context and returns the context"),
    )?;

    registry.register_job(
        Job::from_fn("context:get", ["key"], |context, args, _| {
            let key = string_arg(args, "key")?;
            let value = context.get(key).cloned().unwrap_or(Value::Null);
            Ok(JobOutcome::proceed(json!({ "key": key, "value": value })))
        })
        .with_label("Get context value")
        .with_description("Reads a value from the shared context"),
    )?;

    registry.register_job(
        Job::from_fn("fail", ["message"], |_, args, _| {
            let message = args.get("message").and_then(Value::as_str).unwrap_or("job failed on request");
            Err(anyhow!(message.to_string()))
        })
        .with_label("Fail")
        .with_description("Always fails with the given message"),
    )?;

    registry.register_job(
        Job::from_fn("halt", ["message"], |_, args, log| {
            let message = args.get("message").cloned().unwrap_or(Value::Null);
            log.info("stopping line on request");
            Ok(JobOutcome::stop_line(json!({ "message": message })))
        })
        .with_label("Halt line")
        .with_description("Succeeds and stops the line"),
    )?;

    registry.register_job(
        Job::new("sleep", ["millis"], Sleep)
            .with_label("Sleep")
            .with_description("Waits for the given number of milliseconds"),
    )?;

    Ok(())
}

fn string_arg<'a>(args: &'a ArgMap, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("argument '{name}' must be a string"))
}

struct Sleep;

#[async_trait::async_trait]
impl JobExecutor for Sleep {
    async fn execute(&self, _context: &mut JobContext, args: &ArgMap, log: &mut JobLog) -> Result<JobOutcome> {
        let millis = args
            .get("millis")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("argument 'millis' must be a non-negative integer"))?;
        log.debug(format!("sleeping for {millis}ms"));
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(JobOutcome::proceed(json!({ "slept_ms": millis })))
    }
}
