//! Runloop command-line entry point.
//!
//! stdout carries gate prompts and command results; diagnostics go to stderr
//! and the rolling log file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use runloop::RunloopConfig;
use runloop_logging::{init_logging, LogConfig};
use std::process::ExitCode;

mod cli;

use cli::error::HelpfulError;

#[derive(Parser, Debug)]
#[command(name = "runloop", about = "Human-gated classification runs and drift evaluation")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an artifact, gate the proposal and record the outcome
    Run(cli::run::RunArgs),
    /// Evaluate a pack task (drift policy or input check) against a run input
    Drift(cli::drift::DriftArgs),
    /// Write decision_summary.json for a completed run
    Summary(cli::summary::SummaryArgs),
    /// Render the decision index over all summarised runs
    Index(cli::index::IndexArgs),
}

fn run_command(cli: Cli) -> Result<()> {
    let config = RunloopConfig::load_default().map_err(|e| HelpfulError::config(&e))?;

    match cli.command {
        Commands::Run(args) => cli::run::run(args, &config),
        Commands::Drift(args) => cli::drift::run(args, &config),
        Commands::Summary(args) => cli::summary::run(args, &config),
        Commands::Index(args) => cli::index::run(args, &config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "runloop",
        verbose: cli.verbose,
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
