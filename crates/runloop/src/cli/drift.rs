//! `runloop drift`: execute one pack task against a run input.

use super::error::HelpfulError;
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use runloop::RunloopConfig;
use runloop_drift::{execute_task, DriftError, RunInput, RunOutput, TaskPack};
use runloop_ids::{RunId, TaskId};
use runloop_ledger::write_task_run;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DriftArgs {
    /// Pack directory containing tasks.json
    #[arg(long)]
    pub pack: PathBuf,

    /// Task id within the pack
    #[arg(long)]
    pub task: String,

    /// Run input JSON (run_id, pack_id, task_id, inputs)
    #[arg(long)]
    pub input: PathBuf,

    /// Run id for the output directory (generated when omitted)
    #[arg(long)]
    pub run: Option<String>,

    /// Root directory for task run outputs
    #[arg(long)]
    pub runs_dir: Option<PathBuf>,
}

pub fn run(args: DriftArgs, config: &RunloopConfig) -> Result<()> {
    let pack = TaskPack::load(&args.pack).map_err(|e| HelpfulError::drift(&e))?;
    let task_id = TaskId::parse(&args.task)
        .map_err(|e| HelpfulError::invalid_identifier("task id", &args.task, &e.to_string()))?;
    let task = pack.task(&task_id).map_err(|e| HelpfulError::drift(&e))?;

    let run_id = match &args.run {
        Some(raw) => RunId::parse(raw)
            .map_err(|e| HelpfulError::invalid_identifier("run id", raw, &e.to_string()))?,
        None => RunId::generate(),
    };

    if !args.input.exists() {
        return Err(HelpfulError::file_not_found(&args.input).into());
    }
    let input = RunInput::load(&args.input).map_err(|e| match e {
        DriftError::Json(inner) => HelpfulError::json_parse_error(&args.input, &inner.to_string()),
        other => HelpfulError::drift(&other),
    })?;
    input
        .check_target(&pack.id, &task_id)
        .map_err(|e| HelpfulError::drift(&e))?;

    let outcome = execute_task(task, &input.inputs).map_err(|e| HelpfulError::drift(&e))?;
    let output = RunOutput::new(&input, outcome, Utc::now());

    let runs_dir = args.runs_dir.unwrap_or_else(|| config.drift.runs_dir.clone());
    let paths = write_task_run(&runs_dir, &run_id, &args.input, &output)
        .map_err(|e| HelpfulError::ledger(&e))?;

    println!("Status: {}", output.status);
    println!(
        "Wrote {} and {}",
        paths.output.display(),
        paths.decision_log.display()
    );
    Ok(())
}
