//! `runloop summary`: derive `decision_summary.json` for a finished run.

use super::error::HelpfulError;
use anyhow::Result;
use clap::Args;
use runloop::RunloopConfig;
use runloop_ids::RunId;
use runloop_ledger::{write_summary, DecisionPack, RunLedger};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Run to summarise
    #[arg(long)]
    pub run_id: String,

    /// Root directory for run artifacts
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

pub fn run(args: SummaryArgs, config: &RunloopConfig) -> Result<()> {
    let run_id = RunId::parse(&args.run_id)
        .map_err(|e| HelpfulError::invalid_identifier("run id", &args.run_id, &e.to_string()))?;
    let log_root = args.log_dir.unwrap_or_else(|| config.pipeline.log_dir.clone());

    let ledger = RunLedger::existing(&log_root, &run_id).map_err(|e| HelpfulError::ledger(&e))?;
    let path =
        write_summary(ledger.dir(), &DecisionPack::T_C04).map_err(|e| HelpfulError::ledger(&e))?;

    println!("Wrote: {}", path.display());
    Ok(())
}
