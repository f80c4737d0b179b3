//! Task run outputs: `<runs_dir>/<run_id>/{output.json, decision_log.json}`.

use crate::{LedgerError, Result};
use runloop_drift::{RunOutput, TaskStatus};
use runloop_ids::{PackId, RunId, TaskId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const OUTPUT_FILE: &str = "output.json";
pub const DECISION_LOG_FILE: &str = "decision_log.json";

/// Pointer record tying a task run's input to its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    pub run_id: RunId,
    pub pack_id: PackId,
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub created_at: String,
    pub input_path: String,
    pub output_path: String,
}

#[derive(Debug, Clone)]
pub struct TaskRunPaths {
    pub output: PathBuf,
    pub decision_log: PathBuf,
}

pub fn write_task_run(
    runs_dir: &Path,
    run_id: &RunId,
    input_path: &Path,
    output: &RunOutput,
) -> Result<TaskRunPaths> {
    let dir = runs_dir.join(run_id.as_str());
    let output_path = dir.join(OUTPUT_FILE);
    if output_path.exists() {
        return Err(LedgerError::RunExists(dir));
    }
    fs::create_dir_all(&dir)?;

    fs::write(&output_path, serde_json::to_string_pretty(output)? + "\n")?;

    let log = DecisionLog {
        run_id: output.run_id.clone(),
        pack_id: output.pack_id.clone(),
        task_id: output.task_id.clone(),
        status: output.status,
        created_at: output.created_at.clone(),
        input_path: input_path.display().to_string(),
        output_path: output_path.display().to_string(),
    };
    let log_path = dir.join(DECISION_LOG_FILE);
    fs::write(&log_path, serde_json::to_string_pretty(&log)? + "\n")?;

    info!(run_id = %run_id, status = %output.status, "task run written");
    Ok(TaskRunPaths {
        output: output_path,
        decision_log: log_path,
    })
}
