//! Decision Summary: a ten-section record derived from one gated run.
//!
//! The pack identity and its fixed narrative come from a [`DecisionPack`]
//! supplied by the caller. Run artifacts only contribute the evidence,
//! governance and outcome fields.

use crate::ledger::{read_record, FinalRecord, HumanGateRecord, ProposedRecord};
use crate::stamped::{utc_stamp, Stamped};
use crate::{LedgerError, Result, FINAL_FILE, HUMAN_GATE_FILE, PROPOSED_FILE, SUMMARY_FILE};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use runloop_ids::{DecisionId, PackId, RunId};
use runloop_schema::{Decision, FinalOutcome, HumanDecision, Proposal};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const OWNER_PLACEHOLDER: &str = "<FILL_DECISION_OWNER>";
const SIGNOFF_DATE_PLACEHOLDER: &str = "<FILL_SIGNOFF_DATE>";
const APPROVE_WITH_CONDITIONS: &str = "approve_with_conditions";

#[derive(Debug, Clone, Copy)]
pub struct PackClaim {
    pub claim_id: &'static str,
    pub claim_statement: &'static str,
    pub source: &'static str,
    pub status: &'static str,
}

/// Fixed definitions of a decision pack. Never derived from run data.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPack {
    pub decision_id: &'static str,
    pub pack_id: &'static str,
    pub proposed_action: &'static str,
    pub in_scope: &'static [&'static str],
    pub out_of_scope: &'static [&'static str],
    pub authority: &'static str,
    pub triggering_condition: &'static str,
    pub operational_relevance: &'static str,
    pub claims: &'static [PackClaim],
    pub task_objective: &'static str,
    pub task_inputs: &'static [&'static str],
    pub task_outputs: &'static [&'static str],
    pub latency: &'static str,
    pub cost: &'static str,
    pub data_quality_assumptions: &'static str,
    pub governance: &'static str,
    pub human_oversight_points: &'static [&'static str],
    pub confidence_level: &'static str,
    pub known_uncertainties: &'static [&'static str],
    pub unknowns_explicitly_accepted: &'static [&'static str],
    pub invalid_if: &'static [&'static str],
    pub abstention_triggers: &'static [&'static str],
    pub escalation_path: &'static str,
    pub conditions: &'static [&'static str],
    pub next_review_point: &'static str,
}

impl DecisionPack {
    pub const T_C04: DecisionPack = DecisionPack {
        decision_id: "t_c04",
        pack_id: "t_c04",
        proposed_action: "Approve use of LLM-assisted classification to support operational triage decisions, with mandatory human approval before downstream action.",
        in_scope: &["failure categorization and prioritization support"],
        out_of_scope: &[
            "autonomous remediation",
            "customer-facing actions",
            "irreversible system changes",
        ],
        authority: "phase-gate decision owner",
        triggering_condition: "Manual classification latency and inconsistency materially impact time-to-decision at gate reviews.",
        operational_relevance: "Delays and variability increase release risk, inflate review cost, and degrade confidence in gate readiness.",
        claims: &[PackClaim {
            claim_id: "c04-01",
            claim_statement: "LLM-assisted comparison can surface material discrepancies between two controlled documents faster than manual review without increasing false-positive risk, when outputs are schema-bounded and human-approved.",
            source: "applied analysis",
            status: "supported",
        }],
        task_objective: "Classify operational artifacts into predefined categories to support triage and prioritization.",
        task_inputs: &["structured operational artifact", "canonical taxonomy"],
        task_outputs: &[
            "category assignment (or abstain)",
            "confidence indicator",
            "rationale text",
        ],
        latency: "bounded for analyst workflow",
        cost: "below manual baseline",
        data_quality_assumptions: "noisy, incomplete inputs expected",
        governance: "human approval required for use",
        human_oversight_points: &["review and approve each classification before it informs action"],
        confidence_level: "medium-high (within tested scope)",
        known_uncertainties: &[
            "performance on novel edge cases",
            "long-term drift (requires monitoring)",
        ],
        unknowns_explicitly_accepted: &["environmental drift effects until re-evaluation trigger"],
        invalid_if: &[
            "sustained accuracy degradation on evaluation set",
            "override/abstention rates exceed threshold",
            "taxonomy mismatch or uncontrolled scope expansion",
        ],
        abstention_triggers: &["low confidence", "out-of-taxonomy inputs", "schema violation"],
        escalation_path: "route to human analyst; log event; escalate to decision owner if recurring",
        conditions: &[
            "human approval mandatory",
            "periodic re-evaluation and drift monitoring",
        ],
        next_review_point: "trigger-based (threshold breach, drift signal, or periodic cadence)",
    };
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    pub utc: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionScope {
    pub in_scope: Vec<String>,
    pub out_of_scope: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStatement {
    pub proposed_action: String,
    pub decision_scope: DecisionScope,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTrigger {
    pub triggering_condition: String,
    pub operational_relevance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEvaluated {
    pub claim_id: String,
    pub claim_statement: String,
    pub source: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConstraints {
    pub latency: String,
    pub cost: String,
    pub data_quality_assumptions: String,
    pub governance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_objective: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub constraints: TaskConstraints,
    pub human_oversight_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResults {
    pub proposed: Proposal,
    pub human_gate: HumanDecision,
    #[serde(rename = "final")]
    pub outcome: FinalOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub evidence_sources: Vec<String>,
    pub key_results: KeyResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceUncertainty {
    pub confidence_level: String,
    pub known_uncertainties: Vec<String>,
    pub unknowns_explicitly_accepted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAbstention {
    pub invalid_if: Vec<String>,
    pub abstention_triggers: Vec<String>,
    pub escalation_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub log_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceTraceability {
    pub run_ids: Vec<String>,
    pub model_version: String,
    pub swarm: usize,
    pub evaluation_artifacts: Vec<String>,
    pub human_approvals_recorded: bool,
    pub artifact_paths: ArtifactPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: String,
    pub conditions: Vec<String>,
    pub next_review_point: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signoff {
    pub decision_owner: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub decision_id: DecisionId,
    pub pack_id: PackId,
    pub run_id: RunId,
    pub timestamps: Timestamps,
    pub decision_owner: String,
    pub prepared_by: String,
    pub section_1_decision_statement: DecisionStatement,
    pub section_2_context_trigger: ContextTrigger,
    pub section_3_claims_evaluated: Vec<ClaimEvaluated>,
    pub section_4_task_definition: TaskDefinition,
    pub section_5_evidence_summary: EvidenceSummary,
    pub section_6_confidence_uncertainty: ConfidenceUncertainty,
    pub section_7_failure_abstention: FailureAbstention,
    pub section_8_governance_traceability: GovernanceTraceability,
    pub section_9_decision_outcome: DecisionOutcome,
    pub section_10_signoff: Signoff,
}

/// Outcome label for section 9: an accepted proposal is approved with the
/// pack's conditions, anything else is reported verbatim.
pub fn outcome_label(decision: Decision) -> String {
    match decision {
        Decision::Accept => APPROVE_WITH_CONDITIONS.to_string(),
        other => other.as_str().to_string(),
    }
}

fn local_rendering(utc: &str) -> String {
    match DateTime::parse_from_rfc3339(utc) {
        Ok(at) => at
            .with_timezone(&Local)
            .to_rfc3339_opts(SecondsFormat::Micros, false),
        Err(_) => utc.to_string(),
    }
}

/// Assemble the summary for the run stored in `run_dir`.
pub fn build_summary(run_dir: &Path, pack: &DecisionPack) -> Result<DecisionSummary> {
    let final_record: Stamped<FinalRecord> = read_record(&run_dir.join(FINAL_FILE))?;
    let gate: Stamped<HumanGateRecord> = read_record(&run_dir.join(HUMAN_GATE_FILE))?;
    // Not consulted beyond presence: final.json carries the proposal.
    let _proposed: Stamped<ProposedRecord> = read_record(&run_dir.join(PROPOSED_FILE))?;

    let utc = [&final_record.ts, &gate.ts]
        .into_iter()
        .find(|ts| !ts.is_empty())
        .cloned()
        .unwrap_or_else(|| utc_stamp(Utc::now()));
    let local = local_rendering(&utc);

    let decision_id = DecisionId::parse(pack.decision_id)
        .map_err(|e| LedgerError::InvalidPack(e.to_string()))?;
    let pack_id =
        PackId::parse(pack.pack_id).map_err(|e| LedgerError::InvalidPack(e.to_string()))?;

    let record = final_record.body;
    let run_id = record.run_id.clone();
    let log_dir = fs::canonicalize(run_dir).unwrap_or_else(|_| run_dir.to_path_buf());

    Ok(DecisionSummary {
        decision_id,
        pack_id,
        run_id: run_id.clone(),
        timestamps: Timestamps { utc, local },
        decision_owner: OWNER_PLACEHOLDER.to_string(),
        prepared_by: "system".to_string(),
        section_1_decision_statement: DecisionStatement {
            proposed_action: pack.proposed_action.to_string(),
            decision_scope: DecisionScope {
                in_scope: owned(pack.in_scope),
                out_of_scope: owned(pack.out_of_scope),
            },
            authority: pack.authority.to_string(),
        },
        section_2_context_trigger: ContextTrigger {
            triggering_condition: pack.triggering_condition.to_string(),
            operational_relevance: pack.operational_relevance.to_string(),
        },
        section_3_claims_evaluated: pack
            .claims
            .iter()
            .map(|c| ClaimEvaluated {
                claim_id: c.claim_id.to_string(),
                claim_statement: c.claim_statement.to_string(),
                source: c.source.to_string(),
                status: c.status.to_string(),
            })
            .collect(),
        section_4_task_definition: TaskDefinition {
            task_objective: pack.task_objective.to_string(),
            inputs: owned(pack.task_inputs),
            outputs: owned(pack.task_outputs),
            constraints: TaskConstraints {
                latency: pack.latency.to_string(),
                cost: pack.cost.to_string(),
                data_quality_assumptions: pack.data_quality_assumptions.to_string(),
                governance: pack.governance.to_string(),
            },
            human_oversight_points: owned(pack.human_oversight_points),
        },
        section_5_evidence_summary: EvidenceSummary {
            evidence_sources: vec![format!(
                "run artifacts: logs/{}/({}, {}, {})",
                run_id, PROPOSED_FILE, HUMAN_GATE_FILE, FINAL_FILE
            )],
            key_results: KeyResults {
                proposed: record.proposed,
                human_gate: gate.body.human,
                outcome: record.outcome.clone(),
            },
        },
        section_6_confidence_uncertainty: ConfidenceUncertainty {
            confidence_level: pack.confidence_level.to_string(),
            known_uncertainties: owned(pack.known_uncertainties),
            unknowns_explicitly_accepted: owned(pack.unknowns_explicitly_accepted),
        },
        section_7_failure_abstention: FailureAbstention {
            invalid_if: owned(pack.invalid_if),
            abstention_triggers: owned(pack.abstention_triggers),
            escalation_path: pack.escalation_path.to_string(),
        },
        section_8_governance_traceability: GovernanceTraceability {
            run_ids: vec![run_id.to_string()],
            model_version: record.model,
            swarm: record.swarm,
            evaluation_artifacts: owned(&[
                PROPOSED_FILE,
                HUMAN_GATE_FILE,
                FINAL_FILE,
                crate::CANDIDATES_FILE,
            ]),
            human_approvals_recorded: true,
            artifact_paths: ArtifactPaths {
                log_dir: log_dir.display().to_string(),
            },
        },
        section_9_decision_outcome: DecisionOutcome {
            decision: outcome_label(record.outcome.human_decision),
            conditions: owned(pack.conditions),
            next_review_point: pack.next_review_point.to_string(),
        },
        section_10_signoff: Signoff {
            decision_owner: OWNER_PLACEHOLDER.to_string(),
            date: SIGNOFF_DATE_PLACEHOLDER.to_string(),
        },
    })
}

/// Build and (over)write `decision_summary.json` in `run_dir`.
pub fn write_summary(run_dir: &Path, pack: &DecisionPack) -> Result<PathBuf> {
    let summary = build_summary(run_dir, pack)?;
    // Stamped with the run's own instant so rewrites stay byte-identical.
    let stamped = Stamped {
        ts: summary.timestamps.utc.clone(),
        body: summary,
    };
    let path = run_dir.join(SUMMARY_FILE);
    fs::write(&path, serde_json::to_string_pretty(&stamped)?)?;
    info!(
        run_id = %stamped.body.run_id,
        decision = %stamped.body.section_9_decision_outcome.decision,
        "decision summary written"
    );
    Ok(path)
}
