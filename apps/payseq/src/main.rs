//! payseq - Dependency-ordered payload installer sequencer
//!
//! Loads a plan file and hands its payloads to the sequencer: print the
//! operation order, dry-run it, or execute it against the scripted engine.

mod cli;
mod display;
mod engine;
mod error;
mod events;
mod logging;
mod media;
mod plan;

use crate::cli::{Cli, Commands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::engine::PlanEngine;
use crate::error::CliError;
use crate::events::EventHandler;
use crate::media::{ConsoleAlerts, FsMediaManager};
use crate::plan::Plan;
use clap::Parser;
use payseq_config::Config;
use payseq_events::EventReceiver;
use payseq_sequencer::{simulate_operations, CancelToken, OperationQueue, Scheduler, SchedulerOptions};
use payseq_types::{ColorChoice, OutputFormat};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting payseq v{}", env!("CARGO_PKG_VERSION"));

    // Defaults < file < environment < flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);

    let plan = Plan::load(cli.command.plan_path()).await?;
    let color = config.general.color;
    let format = if cli.global.json {
        OutputFormat::Json
    } else {
        config.general.output
    };
    let renderer = OutputRenderer::new(format, color);

    let output = match cli.command {
        Commands::Order { .. } => order(plan)?,
        Commands::Simulate { .. } => simulate(plan, &config)?,
        Commands::Run { .. } => {
            let colors_enabled = match (format, color) {
                (OutputFormat::Plain, _) | (_, ColorChoice::Never) => false,
                (_, ColorChoice::Always) => true,
                (_, ColorChoice::Auto) => console::Term::stderr().features().colors_supported(),
            };
            let handler = (format != OutputFormat::Json)
                .then(|| EventHandler::new(colors_enabled, cli.global.debug));
            execute(plan, &config, handler).await?
        }
    };

    renderer.render_result(&output)?;

    if let CommandOutput::Run { report, .. } = &output {
        if !report.failed.is_empty() {
            return Err(CliError::PayloadsFailed(report.failed.len()));
        }
        if !report.not_run.is_empty() {
            return Err(CliError::PayloadsNotRun(report.not_run.len()));
        }
    }

    info!("Command completed successfully");
    Ok(())
}

fn order(plan: Plan) -> Result<CommandOutput, CliError> {
    let mut queue = OperationQueue::new();
    queue.open(plan.payloads)?;
    Ok(CommandOutput::Order {
        payloads: queue.queued_payloads().cloned().collect(),
    })
}

fn simulate(plan: Plan, config: &Config) -> Result<CommandOutput, CliError> {
    let mut engine = PlanEngine::new(plan.outcomes);
    let payloads = simulate_operations(plan.payloads, &mut engine, &config.properties)?;
    Ok(CommandOutput::Simulation { payloads })
}

/// Run the plan to completion, printing events as they arrive
async fn execute(
    plan: Plan,
    config: &Config,
    handler: Option<EventHandler>,
) -> Result<CommandOutput, CliError> {
    let options = SchedulerOptions::from_config(config);
    let mode = options.drive_mode();
    let interactive = options.interactive;

    let token = CancelToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, canceling after the current operation");
            interrupt.cancel();
        }
    });

    let (event_sender, event_receiver) = payseq_events::channel();
    let printer = tokio::spawn(print_events(event_receiver, handler));

    let mut scheduler = Scheduler::new(plan.payloads, PlanEngine::new(plan.outcomes), options)
        .with_media_manager(Box::new(FsMediaManager))
        .with_cancel_signal(Arc::new(token))
        .with_events(event_sender);
    if interactive {
        scheduler = scheduler.with_alert_presenter(Box::new(ConsoleAlerts::new()));
    }

    let outcome = scheduler.run(mode).await;
    let payloads = scheduler.payloads().into_iter().cloned().collect();
    // Closing the channel lets the printer drain and finish
    drop(scheduler);
    let _ = printer.await;

    let report = outcome?;
    Ok(CommandOutput::Run { report, payloads })
}

async fn print_events(mut receiver: EventReceiver, mut handler: Option<EventHandler>) {
    while let Some(message) = receiver.recv().await {
        match handler.as_mut() {
            Some(handler) => handler.handle_event(message),
            None => logging::log_event_with_tracing(&message),
        }
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if global.unattended {
        config.scheduler.unattended = true;
    }
}

/// Directory for `--debug` log files
fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("payseq")
        .join("logs")
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let debug_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,payseq=debug"))
    };

    if debug_enabled {
        // Structured JSON logs to file, in JSON mode too
        let dir = log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }
        let log_file = dir.join(format!(
            "payseq-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(debug_filter())
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
            }
            Err(e) if !json_mode => {
                eprintln!("Warning: Failed to create log file: {e}");
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(debug_filter())
                    .init();
            }
            Err(_) => {
                tracing_subscriber::fmt()
                    .with_writer(std::io::sink)
                    .with_env_filter("off")
                    .init();
            }
        }
    } else if json_mode {
        // Keep stdout clean for the JSON document
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
}
