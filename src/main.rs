//! Phasewright CLI
//!
//! Runs a workflow against a recorded model transcript and prints the phase
//! results as JSON. Progress is drawn to stderr as it happens.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use phasewright::models::workflow::WorkflowDefinition;
use phasewright::services::progress::{RenderMode, WriterSink};
use phasewright::storage::{ConfigService, Database, InMemoryJobStore, JobStore};
use phasewright::utils::paths::database_path;
use phasewright::{InferenceResponse, JobRunner, RecallTool, ScriptedProvider, ToolRegistry};

const LOG_ENV: &str = "PHASEWRIGHT_LOG";

#[derive(Parser)]
#[command(name = "phasewright", version, about = "Phase-sequenced LLM orchestration engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow, replaying model responses from a script file.
    Run {
        /// Workflow definition (JSON).
        #[arg(short, long)]
        workflow: PathBuf,
        /// JSON array of recorded model responses.
        #[arg(short, long)]
        script: PathBuf,
        /// Initial input for the first phase.
        #[arg(short, long, default_value = "")]
        input: String,
        /// Engine config file; defaults to the per-user location.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Persist the job to this SQLite database instead of memory.
        #[arg(long)]
        db: Option<PathBuf>,
        /// Persist the job to the per-user database.
        #[arg(long, conflicts_with = "db")]
        persist: bool,
        /// Working directory handed to tools.
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,
    },
    /// Check a workflow definition and its prompt files.
    ValidateWorkflow {
        workflow: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            workflow,
            script,
            input,
            config,
            db,
            persist,
            work_dir,
        } => {
            let db = match (db, persist) {
                (Some(path), _) => Some(path),
                (None, true) => Some(database_path().context("locate job database")?),
                (None, false) => None,
            };
            cmd_run(&workflow, &script, &input, config.as_deref(), db.as_deref(), work_dir).await
        }
        Command::ValidateWorkflow { workflow } => cmd_validate(&workflow),
    }
}

async fn cmd_run(
    workflow_path: &Path,
    script_path: &Path,
    input: &str,
    config_path: Option<&Path>,
    db_path: Option<&Path>,
    work_dir: PathBuf,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigService::open(path),
        None => ConfigService::new(),
    }
    .context("load engine config")?
    .get_config_clone();

    let workflow = WorkflowDefinition::load(workflow_path)
        .with_context(|| format!("load workflow {}", workflow_path.display()))?;
    let workflow_name = workflow.name.clone();
    let description = workflow.description.clone();
    let phases = workflow.into_phases().context("prepare phases")?;

    let raw = std::fs::read_to_string(script_path)
        .with_context(|| format!("read script {}", script_path.display()))?;
    let responses: Vec<InferenceResponse> =
        serde_json::from_str(&raw).context("parse script responses")?;
    let provider = Arc::new(ScriptedProvider::from_responses(responses));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(RecallTool::named(config.sanitizer.recall_tool.clone())));

    let store: Arc<dyn JobStore> = match db_path {
        Some(path) => Arc::new(Database::new(path).context("open job database")?),
        None => Arc::new(InMemoryJobStore::new()),
    };

    let runner = JobRunner::new(provider, Arc::new(registry), config, store)
        .with_work_dir(work_dir)
        .with_sink(Arc::new(WriterSink::new(io::stderr(), RenderMode::Tree)));

    let handle = runner
        .start(&workflow_name, &description, phases, input)
        .await
        .context("start job")?;
    tracing::info!("Started job {}", handle.job_id());

    let outcome = handle.join().await.context("wait for job")?;
    let payload = serde_json::to_string_pretty(&outcome).context("serialize results")?;
    println!("{}", payload);

    if let Some(error) = &outcome.error {
        bail!("job {} failed: {}", outcome.job_id, error);
    }
    Ok(())
}

fn cmd_validate(workflow_path: &Path) -> Result<()> {
    let workflow = WorkflowDefinition::load(workflow_path)
        .with_context(|| format!("load workflow {}", workflow_path.display()))?;
    let name = workflow.name.clone();
    let phases = workflow.into_phases().context("prepare phases")?;
    println!("workflow '{}' is valid ({} phases)", name, phases.len());
    Ok(())
}
