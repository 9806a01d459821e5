use anyhow::{Context, Result};
use local_pipelines::cli::commands::{ListCommand, RunCommand, ValidateCommand};
use local_pipelines::cli::output::*;
use local_pipelines::cli::terminal_output::TerminalReporter;
use local_pipelines::cli::{Cli, Command};
use local_pipelines::core::{ExecutionPlan, PipelineDocument};
use local_pipelines::execution::ExecutionEngine;
use local_pipelines::runtime::{preflight::preflight, DockerCli, RuntimeConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_pipelines(cmd)?,
    }

    Ok(())
}

fn load_document(path: &Path) -> Result<PipelineDocument> {
    debug!("Loading pipeline document {}", path.display());
    PipelineDocument::from_file(path)
        .with_context(|| format!("Failed to load pipeline document {}", path.display()))
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let document = load_document(&cmd.target.document_path())?;
    let selector = cmd.selector.selector();
    let plan = ExecutionPlan::resolve(&document, &selector)
        .with_context(|| format!("Cannot run pipeline {}", selector))?;

    let directory = &cmd.target.directory;
    preflight(&cmd.runtime, directory)
        .await
        .context("Preflight checks failed")?;

    let runtime = DockerCli::new(RuntimeConfig::new().with_binary(&cmd.runtime));
    let engine = ExecutionEngine::new(runtime, cmd.engine_options());

    // Live output would interleave with the JSON report
    if !cmd.json {
        let reporter = Arc::new(TerminalReporter::new());
        engine.add_event_handler(move |event| reporter.on_event(&event));
    }

    let report = engine.execute_plan(&plan, directory).await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report));
    }

    if !report.succeeded() {
        std::process::exit(1);
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    let path = cmd.target.document_path();
    let selector = cmd.selector.selector();

    let plan = PipelineDocument::from_file(&path)
        .and_then(|document| ExecutionPlan::resolve(&document, &selector));

    match plan {
        Ok(plan) => {
            let steps = plan.describe();
            if cmd.json {
                let data = serde_json::json!({
                    "document": path,
                    "pipeline": plan.selector,
                    "steps": steps,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Pipeline document is valid!", CHECK);
                println!("  Document: {}", style(path.display()).dim());
                println!("{}", format_plan(&plan.selector, &steps));
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let document = load_document(&cmd.target.document_path())?;
    let selectors = document.selectors();

    if cmd.json {
        let data = serde_json::json!({ "pipelines": selectors });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if selectors.is_empty() {
        println!("{} No pipelines defined", INFO);
        return Ok(());
    }

    println!("{} Pipelines:", INFO);
    for selector in &selectors {
        println!("  {}", style(selector).bold());
    }

    Ok(())
}
