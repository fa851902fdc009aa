//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod check;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Run multi-agent group chats defined in TOML files.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "PARLEY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a group chat until it completes, pauses, or is interrupted.
    Run(RunArgs),

    /// Validate a chat file and show the roster it defines.
    Check {
        /// Path to the chat definition (TOML).
        config: PathBuf,

        /// Also send a tiny request to the configured provider.
        #[arg(long)]
        probe: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the chat definition (TOML).
    pub config: PathBuf,

    /// Opening user message. Repeat to seed several messages.
    #[arg(short, long)]
    pub seed: Vec<String>,

    /// Read the opening user message from a file.
    #[arg(long, value_name = "PATH")]
    pub seed_file: Option<PathBuf>,

    /// Override the chat file's turn budget.
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u32>,

    /// If the chat pauses at its budget, grant N more turns once and continue.
    #[arg(long, value_name = "N")]
    pub extend: Option<u32>,

    /// Write the final history as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
}
