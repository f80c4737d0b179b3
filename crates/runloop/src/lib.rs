//! Runloop
//!
//! Orchestration for human-gated classification runs:
//!
//! 1. a [`Classifier`](classifier::Classifier) is called once per swarm member
//! 2. the candidates are aggregated into a single proposal
//! 3. a reviewer accepts, overrides or rejects it at the human gate
//! 4. the final outcome is derived from that decision alone
//!
//! Every step lands in the run ledger before the next begins.

pub mod classifier;
pub mod config;
pub mod pipeline;

pub use classifier::{
    build_user_payload, Classifier, ClassifierError, CommandClassifier, ReplayClassifier,
    SYSTEM_INSTRUCTIONS,
};
pub use config::{ConfigError, RunloopConfig};
pub use pipeline::{load_taxonomy, run_pipeline, RunError, RunReport, RunRequest};
