//! Task packs and the run input/output documents.
//!
//! A pack is a directory holding `tasks.json`; its directory name is the
//! pack id. The drift task gets the policy evaluator, every other task gets
//! a summary executor that only checks and echoes its inputs.

use crate::evaluate::{evaluate_inputs, TaskOutcome, TaskResult, TaskStatus};
use crate::{DriftError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use runloop_ids::{PackId, RunId, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Task id routed to the drift evaluator.
pub const DRIFT_TASK_ID: &str = "t_c04";

const TASKS_FILE: &str = "tasks.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInputs {
    #[serde(default)]
    pub required: Vec<InputField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    pub task_id: TaskId,
    pub name: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub inputs: TaskInputs,
}

impl TaskDef {
    pub fn required_inputs(&self) -> Vec<String> {
        self.inputs.required.iter().map(|f| f.name.clone()).collect()
    }

    pub fn is_drift_task(&self) -> bool {
        self.task_id.as_str() == DRIFT_TASK_ID
    }
}

#[derive(Debug, Deserialize)]
struct TasksFile {
    tasks: Vec<TaskDef>,
}

#[derive(Debug, Clone)]
pub struct TaskPack {
    pub id: PackId,
    pub dir: PathBuf,
    pub tasks: Vec<TaskDef>,
}

impl TaskPack {
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(DriftError::PackNotFound(dir.display().to_string()));
        }
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DriftError::PackNotFound(dir.display().to_string()))?;
        let id = PackId::parse(name)
            .map_err(|e| DriftError::PackNotFound(format!("{}: {}", dir.display(), e)))?;

        let content = fs::read_to_string(dir.join(TASKS_FILE))?;
        let file: TasksFile = serde_json::from_str(&content)?;
        debug!(pack = %id, tasks = file.tasks.len(), "loaded task pack");

        Ok(Self {
            id,
            dir: dir.to_path_buf(),
            tasks: file.tasks,
        })
    }

    pub fn task(&self, task_id: &TaskId) -> Result<&TaskDef> {
        self.tasks
            .iter()
            .find(|t| &t.task_id == task_id)
            .ok_or_else(|| DriftError::TaskNotFound {
                pack: self.id.to_string(),
                task: task_id.to_string(),
            })
    }
}

/// `input.json` for one task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    pub run_id: RunId,
    pub pack_id: PackId,
    pub task_id: TaskId,
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

impl RunInput {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The input must name the pack and task it is run against.
    pub fn check_target(&self, pack: &PackId, task: &TaskId) -> Result<()> {
        if &self.pack_id != pack {
            return Err(DriftError::PackMismatch {
                field: "pack_id",
                expected: pack.to_string(),
                found: self.pack_id.to_string(),
            });
        }
        if &self.task_id != task {
            return Err(DriftError::PackMismatch {
                field: "task_id",
                expected: task.to_string(),
                found: self.task_id.to_string(),
            });
        }
        Ok(())
    }
}

/// `output.json` for one task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: RunId,
    pub pack_id: PackId,
    pub task_id: TaskId,
    pub created_at: String,
    pub status: TaskStatus,
    pub result: TaskResult,
    pub evidence: Vec<String>,
    pub notes: String,
}

impl RunOutput {
    pub fn new(input: &RunInput, outcome: TaskOutcome, created_at: DateTime<Utc>) -> Self {
        Self {
            run_id: input.run_id.clone(),
            pack_id: input.pack_id.clone(),
            task_id: input.task_id.clone(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, false),
            status: outcome.status,
            result: outcome.result,
            evidence: outcome.evidence,
            notes: outcome.notes,
        }
    }
}

/// Run one task against its inputs.
pub fn execute_task(task: &TaskDef, inputs: &Map<String, Value>) -> Result<TaskOutcome> {
    let required = task.required_inputs();
    if task.is_drift_task() {
        return evaluate_inputs(inputs, &required);
    }

    let missing: Vec<String> = required
        .into_iter()
        .filter(|k| !inputs.contains_key(k))
        .collect();
    if !missing.is_empty() {
        return Ok(TaskOutcome::missing_inputs(missing));
    }

    let evidence = ["eval_artifacts", "production_metrics_timeseries"]
        .iter()
        .filter(|k| inputs.contains_key(**k))
        .map(|k| format!("{} provided", k))
        .collect();
    let inputs_seen: Vec<&String> = inputs.keys().collect();

    info!(task = %task.task_id, "summary executor ran");
    Ok(TaskOutcome {
        status: TaskStatus::Ok,
        result: TaskResult::Summary(json!({
            "task_name": task.name,
            "objective": task.objective,
            "inputs_seen": inputs_seen,
        })),
        evidence,
        notes: "No domain executor for this task; inputs checked and echoed.".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AbstainReason;
    use tempfile::TempDir;

    fn task(id: &str, required: &[&str]) -> TaskDef {
        TaskDef {
            task_id: TaskId::parse(id).unwrap(),
            name: format!("task {}", id),
            objective: "measure".to_string(),
            inputs: TaskInputs {
                required: required
                    .iter()
                    .map(|n| InputField {
                        name: n.to_string(),
                        description: None,
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_load_pack_uses_directory_name() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("agents_pack");
        fs::create_dir(&dir).unwrap();
        fs::write(
            dir.join(TASKS_FILE),
            r#"{"tasks":[{"task_id":"t_c04","name":"Drift","objective":"watch","inputs":{"required":[{"name":"drift_policy"}]}}]}"#,
        )
        .unwrap();

        let pack = TaskPack::load(&dir).unwrap();
        assert_eq!(pack.id.as_str(), "agents_pack");
        let t = pack.task(&TaskId::parse("t_c04").unwrap()).unwrap();
        assert!(t.is_drift_task());
        assert_eq!(t.required_inputs(), vec!["drift_policy"]);
        assert!(matches!(
            pack.task(&TaskId::parse("t_x").unwrap()),
            Err(DriftError::TaskNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_pack_dir() {
        let tmp = TempDir::new().unwrap();
        let err = TaskPack::load(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, DriftError::PackNotFound(_)));
    }

    #[test]
    fn test_run_input_target_check() {
        let input: RunInput = serde_json::from_value(json!({
            "run_id": "run_1", "pack_id": "p", "task_id": "t_c04", "inputs": {}
        }))
        .unwrap();
        let pack = PackId::parse("p").unwrap();
        let task_id = TaskId::parse("t_c04").unwrap();
        assert!(input.check_target(&pack, &task_id).is_ok());
        let other = PackId::parse("q").unwrap();
        assert!(matches!(
            input.check_target(&other, &task_id),
            Err(DriftError::PackMismatch { field: "pack_id", .. })
        ));
    }

    #[test]
    fn test_summary_executor_abstains_on_missing() {
        let t = task("t_c01", &["eval_artifacts", "owner"]);
        let mut inputs = Map::new();
        inputs.insert("owner".into(), json!("ops"));
        let outcome = execute_task(&t, &inputs).unwrap();
        assert_eq!(
            outcome.abstain_reason(),
            Some(&AbstainReason::MissingRequiredInputs {
                missing: vec!["eval_artifacts".to_string()]
            })
        );
    }

    #[test]
    fn test_summary_executor_echoes_inputs() {
        let t = task("t_c01", &["eval_artifacts"]);
        let mut inputs = Map::new();
        inputs.insert("eval_artifacts".into(), json!([]));
        let outcome = execute_task(&t, &inputs).unwrap();
        assert_eq!(outcome.status, TaskStatus::Ok);
        assert_eq!(outcome.evidence, vec!["eval_artifacts provided"]);
        match outcome.result {
            TaskResult::Summary(v) => assert_eq!(v["inputs_seen"], json!(["eval_artifacts"])),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_drift_task_routes_to_evaluator() {
        let t = task(DRIFT_TASK_ID, &["drift_policy"]);
        let outcome = execute_task(&t, &Map::new()).unwrap();
        assert_eq!(outcome.status, TaskStatus::Abstained);
    }
}
