//! Run Ledger
//!
//! Every run gets its own directory under a log root. Artifacts are written in
//! pipeline order and never rewritten:
//!
//! ```text
//! <log_root>/<run_id>/
//!   candidates.jsonl       one line per classifier call (append-only)
//!   proposed.json          the aggregated proposal (write-once)
//!   human_gate.json        the reviewer's decision (write-once)
//!   final.json             the acted-upon outcome (write-once)
//!   decision_summary.json  derived; rebuilt on demand
//! ```
//!
//! Each record carries a `_ts` capture stamp (see [`Stamped`]). Summaries and
//! the decision index are reducers over these files and never touch them.

pub mod index;
pub mod ledger;
pub mod stamped;
pub mod summary;
pub mod task_run;

pub use index::{collect_index, render_index, write_index, IndexEntry, INDEX_UNKNOWN};
pub use ledger::{CandidateRecord, FinalRecord, HumanGateRecord, ProposedRecord, RunLedger};
pub use stamped::{utc_stamp, Stamped};
pub use summary::{build_summary, write_summary, DecisionPack, DecisionSummary};
pub use task_run::{write_task_run, DecisionLog, TaskRunPaths};

use std::path::PathBuf;
use thiserror::Error;

pub const CANDIDATES_FILE: &str = "candidates.jsonl";
pub const PROPOSED_FILE: &str = "proposed.json";
pub const HUMAN_GATE_FILE: &str = "human_gate.json";
pub const FINAL_FILE: &str = "final.json";
pub const SUMMARY_FILE: &str = "decision_summary.json";

/// Artifacts whose presence marks a directory as an existing run.
pub const RUN_ARTIFACTS: [&str; 4] = [CANDIDATES_FILE, PROPOSED_FILE, HUMAN_GATE_FILE, FINAL_FILE];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("run directory already holds artifacts: {0}")]
    RunExists(PathBuf),

    #[error("run directory not found: {0}")]
    RunNotFound(PathBuf),

    #[error("artifact already written: {0}")]
    AlreadyWritten(PathBuf),

    #[error("missing artifact: {0}")]
    MissingArtifact(PathBuf),

    #[error("malformed artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid decision pack: {0}")]
    InvalidPack(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
