use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use jobline_engine::{ArgMap, ExecuteOptions, JobLineJournal, JournalStatus, Registry, document::register_document, parse_job_line_file};
use serde_json::Value;
use tracing::info;

mod jobs;

#[derive(Debug, Parser)]
#[command(name = "jobline", version, about = "Run and resume job lines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a job line and print its journal as JSON.
    Run {
        /// YAML or JSON file with job line definitions.
        #[arg(short, long)]
        file: PathBuf,
        /// Name of the line to execute.
        #[arg(short, long)]
        line: String,
        /// External argument as key=value; values are parsed as JSON when possible.
        #[arg(short, long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
        /// Journal of a previous attempt to resume from.
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Write the journal to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the lines defined in a file and the built-in jobs.
    List {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            file,
            line,
            args,
            resume,
            output,
        } => {
            let registry = load_registry(&file)?;
            let mut options = ExecuteOptions::new(parse_external_args(&args)?);
            if let Some(path) = resume {
                options = options.resume_from(read_journal(&path)?);
            }

            let journal = registry.execute_job_line(line.as_str(), options).await?;
            write_journal(&journal, output.as_deref())?;

            if journal.status == JournalStatus::Exception {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::List { file } => {
            let registry = load_registry(&file)?;
            print!("{}", render_listing(&registry));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Lines in definition order, then jobs with their display names and parameters.
fn render_listing(registry: &Registry) -> String {
    let mut listing = String::from("lines:\n");
    for line in registry.lines.iter() {
        listing.push_str(&format!("  - {} ({} steps)\n", line.name, line.steps.len()));
        if !line.required_args.is_empty() {
            listing.push_str(&format!("      required: {}\n", line.required_args.join(", ")));
        }
    }
    listing.push_str("jobs:\n");
    for job in registry.jobs.iter() {
        listing.push_str(&format!("  - {} ({}) [{}]\n", job.display_name(), job.name, job.formal_args.join(", ")));
        if let Some(description) = &job.description {
            listing.push_str(&format!("      {description}\n"));
        }
    }
    listing
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_registry(file: &Path) -> Result<Registry> {
    let mut registry = Registry::new();
    jobs::register_builtin_jobs(&mut registry)?;
    let document = parse_job_line_file(file)?;
    let count = register_document(&mut registry, document).with_context(|| format!("failed to register lines from {}", file.display()))?;
    info!(lines = count, file = %file.display(), "loaded job lines");
    Ok(registry)
}

fn parse_external_args(pairs: &[String]) -> Result<ArgMap> {
    let mut args = ArgMap::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("invalid argument '{pair}': expected KEY=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid argument '{pair}': key is empty");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        args.insert(key.to_string(), value);
    }
    Ok(args)
}

fn read_journal(path: &Path) -> Result<JobLineJournal> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read journal: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse journal: {}", path.display()))
}

fn write_journal(journal: &JobLineJournal, output: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(journal)?;
    match output {
        Some(path) => fs::write(path, rendered).with_context(|| format!("Failed to write journal: {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
