//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (defaults on first run or unreadable file).
//! 3. Create the tokio runtime.
//! 4. Dispatch the subcommand.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use math_mentor::{
    backend::HttpBackend,
    config::{AppConfig, AppPaths},
    pipeline::{PipelineEvent, PipelineOrchestrator, RunStatus, StageName},
    session::SessionController,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "math-mentor", version, about = "Solve math questions through the agent pipeline")]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve a typed question and print the result as JSON.
    Solve {
        /// The question, e.g. `2+2`.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Check that the backend is reachable.
    Health,
    /// Write the default settings file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn solve(config: AppConfig, text: String) -> Result<ExitCode> {
    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(32);

    let backend = Arc::new(HttpBackend::from_config(&config.backend));
    let orchestrator = PipelineOrchestrator::new(backend, &config).with_events(event_tx);
    let mut session = SessionController::new(&config, orchestrator);

    session.edit_text(text)?;
    let Some(handle) = session.submit() else {
        bail!("nothing to solve");
    };

    // Progress goes to stderr so stdout stays pure JSON.
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let run = handle.wait().await;
    // Dropping the session closes the event channel and ends the printer.
    drop(session);
    if let Err(e) = printer.await {
        log::warn!("progress printer ended abnormally: {e}");
    }

    if let Some(result) = run.outcome() {
        println!("{}", serde_json::to_string_pretty(result)?);
    }

    match run.status() {
        RunStatus::Completed => Ok(ExitCode::SUCCESS),
        _ => {
            if let Some(error) = run.failure() {
                eprintln!("error: {error}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_event(event: &PipelineEvent) {
    let total = StageName::ALL.len();
    let mut err = std::io::stderr().lock();
    let _ = match event {
        PipelineEvent::RunStarted { requires_hitl, .. } => {
            if *requires_hitl {
                writeln!(err, "submitting (flagged for review)")
            } else {
                writeln!(err, "submitting")
            }
        }
        PipelineEvent::StageStarted { index, stage, .. } => {
            writeln!(err, "[{}/{total}] {stage}...", index + 1)
        }
        PipelineEvent::StageCompleted {
            index,
            stage,
            summary,
            ..
        } => writeln!(err, "[{}/{total}] {stage}: {summary}", index + 1),
        PipelineEvent::RunCompleted { .. } => writeln!(err, "done"),
        PipelineEvent::RunErrored { error, .. } => writeln!(err, "failed: {error}"),
    };
}

async fn health(config: AppConfig) -> Result<ExitCode> {
    let backend = HttpBackend::from_config(&config.backend);
    match backend.health().await {
        Ok(status) => {
            match status.model {
                Some(model) => println!("{} ({model})", status.status),
                None => println!("{}", status.status),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("backend unreachable at {}: {e}", config.backend.health_url());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_config(path: PathBuf, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default()
        .save_to(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&PathBuf>) -> AppConfig {
    let loaded = match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    })
}

// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Command::InitConfig { force } = cli.command {
        let path = cli.config.unwrap_or_else(|| AppPaths::new().settings_file);
        return init_config(path, force);
    }

    // 2. Configuration
    if cli.config.is_none() && AppConfig::is_first_run() {
        log::info!("No settings file found; using defaults (run `init-config` to create one)");
    }
    let config = load_config(cli.config.as_ref());

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Dispatch
    rt.block_on(async {
        match cli.command {
            Command::Solve { text } => solve(config, text.join(" ")).await,
            Command::Health => health(config).await,
            Command::InitConfig { .. } => Ok(ExitCode::SUCCESS),
        }
    })
}
