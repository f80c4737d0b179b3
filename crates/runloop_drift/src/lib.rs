//! Drift Policy Evaluation
//!
//! Compares the most recent production metrics window against a recorded
//! baseline under a declarative [`DriftPolicy`]. The result is always one of:
//!
//! - `abstained`: not enough data, or required inputs missing. Abstention is
//!   an auditable outcome, not an error.
//! - `ok` with a [`DriftVerdict`]: drift flags, the recommended action and the
//!   signals that fired.
//!
//! Evidence (baseline values, the evaluated window and its timestamps) is
//! recorded whether or not drift is detected.
//!
//! # Modules
//!
//! - [`policy`]: policy and metrics documents
//! - [`evaluate`]: the evaluation rule and task outcomes
//! - [`pack`]: task packs, run inputs and run outputs

pub mod evaluate;
pub mod pack;
pub mod policy;

pub use evaluate::{
    evaluate, evaluate_inputs, AbstainReason, DriftVerdict, RecommendedAction, TaskOutcome,
    TaskResult, TaskStatus, BASELINE_KEY, DRIFT_POLICY_KEY, TIMESERIES_KEY,
};
pub use pack::{execute_task, RunInput, RunOutput, TaskDef, TaskPack, DRIFT_TASK_ID};
pub use policy::{DriftPolicy, MetricsWindow};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("invalid drift policy: {0}")]
    InvalidPolicy(String),

    #[error("malformed input '{key}': {source}")]
    MalformedInput {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pack directory not found: {0}")]
    PackNotFound(String),

    #[error("task not found in pack {pack}: {task}")]
    TaskNotFound { pack: String, task: String },

    #[error("run input {field} '{found}' does not match requested '{expected}'")]
    PackMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DriftError>;
