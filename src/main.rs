// Redactor - Text redaction service
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use redactor::config::{load_config, Config};
use redactor::jobs::JobScheduler;
use redactor::models::ModelStore;
use redactor::redaction::{RedactionService, SubprocessPredictor};
use redactor::server::{AppState, RedactorServer, ServerConfig};
use redactor::training::{spawn_failure_listener, SubprocessTrainer, TrainingOrchestrator};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "redactor")]
#[command(about = "Text redaction service", version)]
struct Args {
    /// Run mode (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (default: ~/.redactor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model root directory (overrides config and REDACTOR_MODEL_DIR)
    #[arg(long = "model-dir", global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config and REDACTOR_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the known models and their status as JSON
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = args.model_dir {
        config.model_dir = dir;
    }

    match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            run_server(config).await
        }
        Command::Models => run_list_models(&config),
    }
}

/// Initialize tracing with RUST_LOG support (default: info)
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // init() also installs the log → tracing bridge (tracing-log feature)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(config: &Config) -> Result<ModelStore> {
    ModelStore::open(&config.model_dir).map_err(|e| {
        anyhow::anyhow!(redactor::errors::model_dir_unusable_error(
            &config.model_dir.display().to_string(),
            &e.to_string(),
        ))
    })
}

/// Run the HTTP server
async fn run_server(config: Config) -> Result<()> {
    tracing::info!(model_dir = %config.model_dir.display(), "Starting redactor");

    let store = Arc::new(open_store(&config)?);

    // The failure listener is the only subscriber to scheduler events
    let (scheduler, job_events) = JobScheduler::new();
    spawn_failure_listener(Arc::clone(&store), job_events);

    let trainer = Arc::new(SubprocessTrainer::new(
        config.trainer.clone(),
        store.root().to_path_buf(),
    ));
    let orchestrator = Arc::new(TrainingOrchestrator::new(
        Arc::clone(&store),
        Arc::new(scheduler),
        trainer,
    ));

    let predictor = Arc::new(SubprocessPredictor::new(config.predictor.clone()));
    let redaction = RedactionService::new(predictor);

    let server = RedactorServer::new(
        ServerConfig {
            bind_address: config.bind_address.clone(),
        },
        AppState::new(orchestrator, redaction),
    );

    tokio::select! {
        result = server.serve() => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    }
}

/// Print the model list
fn run_list_models(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let models = store.list_models()?;
    let json = serde_json::json!({ "models": models });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
