//! Drift evaluation through a task pack on disk.

use runloop_drift::{
    execute_task, RecommendedAction, RunInput, RunOutput, TaskPack, TaskResult, TaskStatus,
};
use runloop_ids::TaskId;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_pack(root: &Path) -> std::path::PathBuf {
    let dir = root.join("measuring_agents");
    fs::create_dir_all(&dir).unwrap();
    let tasks = json!({
        "tasks": [{
            "task_id": "t_c04",
            "name": "Drift monitoring",
            "objective": "Detect drift against baseline",
            "inputs": {"required": [
                {"name": "production_metrics_timeseries"},
                {"name": "baseline_metrics"},
                {"name": "drift_policy"}
            ]}
        }]
    });
    fs::write(dir.join("tasks.json"), tasks.to_string()).unwrap();
    dir
}

fn run_input(last_success: f64) -> RunInput {
    serde_json::from_value(json!({
        "run_id": "run_drift01",
        "pack_id": "measuring_agents",
        "task_id": "t_c04",
        "inputs": {
            "production_metrics_timeseries": [
                {"window_start": "2026-03-01", "window_end": "2026-03-07",
                 "task_success_rate": 0.91, "override_rate": 0.05},
                {"window_start": "2026-03-08", "window_end": "2026-03-14",
                 "task_success_rate": last_success, "override_rate": 0.05}
            ],
            "baseline_metrics": {"task_success_rate": 0.90, "override_rate": 0.05},
            "drift_policy": {"min_windows": 2, "task_success_drop_pct": 0.10, "override_increase_pct": 0.20}
        }
    }))
    .unwrap()
}

#[test]
fn drift_detected_from_pack() {
    let tmp = TempDir::new().unwrap();
    let pack = TaskPack::load(&write_pack(tmp.path())).unwrap();
    let task_id = TaskId::parse("t_c04").unwrap();
    let task = pack.task(&task_id).unwrap();

    let input = run_input(0.75);
    input.check_target(&pack.id, &task_id).unwrap();
    let outcome = execute_task(task, &input.inputs).unwrap();

    let verdict = outcome.verdict().unwrap();
    assert!(verdict.drift_detected);
    assert_eq!(
        verdict.recommended_action,
        RecommendedAction::ReEvaluateAgentAndInvestigateDataShift
    );
    assert!(outcome.evidence[1].contains("2026-03-08..2026-03-14"));
}

#[test]
fn stable_metrics_produce_no_action_output() {
    let tmp = TempDir::new().unwrap();
    let pack = TaskPack::load(&write_pack(tmp.path())).unwrap();
    let task = pack.task(&TaskId::parse("t_c04").unwrap()).unwrap();

    let input = run_input(0.89);
    let outcome = execute_task(task, &input.inputs).unwrap();
    let output = RunOutput::new(&input, outcome, chrono::Utc::now());

    assert_eq!(output.status, TaskStatus::Ok);
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["result"]["recommended_action"], "no_action");
    assert_eq!(value["result"]["drift_detected"], false);
    assert_eq!(value["run_id"], "run_drift01");
    assert_eq!(value["evidence"].as_array().unwrap().len(), 2);
    assert!(matches!(output.result, TaskResult::Drift(_)));
}

#[test]
fn missing_policy_abstains_and_serializes_reason() {
    let tmp = TempDir::new().unwrap();
    let pack = TaskPack::load(&write_pack(tmp.path())).unwrap();
    let task = pack.task(&TaskId::parse("t_c04").unwrap()).unwrap();

    let mut input = run_input(0.75);
    input.inputs.remove("drift_policy");
    let outcome = execute_task(task, &input.inputs).unwrap();
    let value = serde_json::to_value(&outcome).unwrap();

    assert_eq!(value["status"], "abstained");
    assert_eq!(value["result"]["reason"], "missing_required_inputs");
    assert_eq!(value["result"]["missing"], json!(["drift_policy"]));
}
