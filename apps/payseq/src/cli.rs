//! Command line interface definition

use clap::{Parser, Subcommand};
use payseq_types::ColorChoice;
use std::path::PathBuf;

/// payseq - Dependency-ordered payload installer sequencer
#[derive(Parser)]
#[command(name = "payseq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency-ordered payload installer sequencer")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the payseq log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Never prompt and poll without waiting
    #[arg(long, global = true)]
    pub unattended: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the order in which the plan's payloads would be processed
    Order {
        /// Path to the plan file (JSON)
        plan: PathBuf,
    },

    /// Dry-run the plan against its scripted outcomes
    #[command(alias = "sim")]
    Simulate {
        /// Path to the plan file (JSON)
        plan: PathBuf,
    },

    /// Execute the plan, polling the scripted engine until every payload ran
    Run {
        /// Path to the plan file (JSON)
        plan: PathBuf,
    },
}

impl Commands {
    pub fn plan_path(&self) -> &PathBuf {
        match self {
            Self::Order { plan } | Self::Simulate { plan } | Self::Run { plan } => plan,
        }
    }
}
