//! `runloop index`: render the markdown decision index.

use super::error::HelpfulError;
use anyhow::Result;
use clap::Args;
use runloop::RunloopConfig;
use runloop_ledger::write_index;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Root directory for run artifacts
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Output markdown file
    #[arg(long, default_value = "DECISIONS.md")]
    pub out: PathBuf,
}

pub fn run(args: IndexArgs, config: &RunloopConfig) -> Result<()> {
    let log_root = args.log_dir.unwrap_or_else(|| config.pipeline.log_dir.clone());
    if !log_root.is_dir() {
        return Err(HelpfulError::path_not_found(&log_root).into());
    }
    let count = write_index(&log_root, &args.out).map_err(|e| HelpfulError::ledger(&e))?;

    println!("Wrote: {} ({} decisions)", args.out.display(), count);
    Ok(())
}
