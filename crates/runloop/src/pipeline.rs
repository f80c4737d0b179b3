//! One classification run, end to end.
//!
//! Classifier calls run first and all of them must succeed before anything is
//! persisted. From there each step is written to the ledger before the next
//! one starts, and the gate is the only place the run waits.

use crate::classifier::{build_user_payload, Classifier, ClassifierError, SYSTEM_INSTRUCTIONS};
use runloop_gate::{prompt_decision, GateError, GateState, HumanGate};
use runloop_ids::RunId;
use runloop_ledger::{FinalRecord, LedgerError, RunLedger};
use runloop_schema::{
    aggregate_with_outcome, candidate_json_schema, AggregateError, Candidate, FinalOutcome,
    HumanDecision, Proposal, SwarmOutcome,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("classifier failure: {0}")]
    Classifier(#[source] ClassifierError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

impl From<ClassifierError> for RunError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Schema(msg) => RunError::SchemaViolation(msg),
            other => RunError::Classifier(other),
        }
    }
}

impl From<AggregateError> for RunError {
    fn from(err: AggregateError) -> Self {
        RunError::Configuration(err.to_string())
    }
}

/// Read a taxonomy file: a JSON list of category strings.
pub fn load_taxonomy(path: &Path) -> Result<Vec<String>, RunError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RunError::Configuration(format!("cannot read taxonomy {}: {}", path.display(), e))
    })?;
    let taxonomy: Vec<String> = serde_json::from_str(&content).map_err(|_| {
        RunError::Configuration(format!(
            "taxonomy must be a JSON list of strings: {}",
            path.display()
        ))
    })?;
    Ok(taxonomy)
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run_id: RunId,
    pub artifact: String,
    pub taxonomy: Vec<String>,
    pub swarm: usize,
    pub log_root: PathBuf,
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub run_dir: PathBuf,
    pub proposal: Proposal,
    pub swarm_outcome: SwarmOutcome,
    pub gate_state: GateState,
    pub human: HumanDecision,
    pub outcome: FinalOutcome,
}

fn classify_swarm<C: Classifier + ?Sized>(
    classifier: &C,
    user_content: &str,
    swarm: usize,
) -> Vec<Result<Candidate, ClassifierError>> {
    let schema = candidate_json_schema();
    let schema = &schema;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..swarm)
            .map(|i| {
                scope.spawn(move || {
                    debug!(i, "classifier call issued");
                    classifier.classify_at(i, SYSTEM_INSTRUCTIONS, user_content, schema)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(ClassifierError::Failed {
                        status: "panicked".to_string(),
                        stderr: String::new(),
                    })
                })
            })
            .collect()
    })
}

/// Execute one run: classify, aggregate, gate, finalise.
///
/// `input`/`out` drive the human gate.
pub fn run_pipeline<C, R, W>(
    classifier: &C,
    request: &RunRequest,
    input: &mut R,
    out: &mut W,
) -> Result<RunReport, RunError>
where
    C: Classifier + ?Sized,
    R: BufRead,
    W: Write,
{
    if request.swarm == 0 {
        return Err(RunError::Configuration("swarm must be >= 1".to_string()));
    }
    if request.taxonomy.is_empty() {
        return Err(RunError::Configuration("taxonomy is empty".to_string()));
    }

    let ledger = RunLedger::open(&request.log_root, &request.run_id)?;
    info!(
        run_id = %request.run_id,
        swarm = request.swarm,
        model = classifier.model(),
        "run started"
    );

    let user_content = build_user_payload(&request.artifact, &request.taxonomy);
    let candidates = classify_swarm(classifier, &user_content, request.swarm)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    for candidate in &candidates {
        if let Some(category) = candidate.category() {
            if !request.taxonomy.iter().any(|t| t == category) {
                warn!(category, "candidate category is not in the taxonomy");
            }
        }
    }

    for (i, candidate) in candidates.iter().enumerate() {
        ledger.append_candidate(i, candidate)?;
    }

    let (proposal, swarm_outcome) = aggregate_with_outcome(&candidates)?;
    ledger.write_proposed(&proposal)?;
    info!(
        run_id = %request.run_id,
        outcome = swarm_outcome.as_str(),
        category = proposal.category().unwrap_or("None"),
        "proposal recorded"
    );

    let mut gate = match &request.reviewer {
        Some(reviewer) => HumanGate::new().with_reviewer(reviewer.clone()),
        None => HumanGate::new(),
    };
    let ticket = gate.submit(proposal.clone());
    let resolution = prompt_decision(&mut gate, &ticket, input, out)?;
    ledger.write_human_gate(&resolution.decision, &resolution.transitions)?;

    let outcome = FinalOutcome::from_decision(&resolution.decision);
    ledger.write_final(&FinalRecord {
        run_id: request.run_id.clone(),
        model: classifier.model().to_string(),
        swarm: request.swarm,
        proposed: proposal.clone(),
        outcome: outcome.clone(),
    })?;
    info!(
        run_id = %request.run_id,
        decision = %resolution.decision.decision,
        "run complete"
    );

    Ok(RunReport {
        run_id: request.run_id.clone(),
        run_dir: ledger.dir().to_path_buf(),
        proposal,
        swarm_outcome,
        gate_state: resolution.state,
        human: resolution.decision,
        outcome,
    })
}
