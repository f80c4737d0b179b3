//! The v1 drift rule: last window vs baseline.
//!
//! Only the most recent window is consulted; there is no trend analysis
//! across windows in this policy version.

use crate::policy::{DriftPolicy, MetricsWindow};
use crate::{DriftError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{info, warn};

pub const TIMESERIES_KEY: &str = "production_metrics_timeseries";
pub const BASELINE_KEY: &str = "baseline_metrics";
pub const DRIFT_POLICY_KEY: &str = "drift_policy";

const POLICY_NOTES: &str = "v1 drift policy applied to last window vs baseline.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Ok,
    Abstained,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ok => "ok",
            TaskStatus::Abstained => "abstained",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    NoAction,
    ReEvaluateAgentAndInvestigateDataShift,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::NoAction => "no_action",
            RecommendedAction::ReEvaluateAgentAndInvestigateDataShift => {
                "re_evaluate_agent_and_investigate_data_shift"
            }
        }
    }
}

/// Why an evaluation abstained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbstainReason {
    InsufficientWindows { have: usize, need: usize },
    MissingRequiredInputs { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftVerdict {
    pub drift_detected: bool,
    pub drift_signals: Vec<String>,
    pub recommended_action: RecommendedAction,
    pub notes: String,
}

/// Result payload of a task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Drift(DriftVerdict),
    Abstained(AbstainReason),
    Summary(Value),
}

/// `(status, result, evidence, notes)` for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub result: TaskResult,
    pub evidence: Vec<String>,
    pub notes: String,
}

impl TaskOutcome {
    pub fn abstained(reason: AbstainReason, notes: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Abstained,
            result: TaskResult::Abstained(reason),
            evidence: Vec::new(),
            notes: notes.into(),
        }
    }

    pub fn missing_inputs(missing: Vec<String>) -> Self {
        let notes = format!("Missing required inputs: {:?}", missing);
        Self::abstained(AbstainReason::MissingRequiredInputs { missing }, notes)
    }

    pub fn verdict(&self) -> Option<&DriftVerdict> {
        match &self.result {
            TaskResult::Drift(verdict) => Some(verdict),
            _ => None,
        }
    }

    pub fn abstain_reason(&self) -> Option<&AbstainReason> {
        match &self.result {
            TaskResult::Abstained(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Relative drop from baseline; zero when the baseline is zero.
fn pct_drop(baseline: f64, current: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    (baseline - current) / baseline
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn display_bound(bound: &Option<String>) -> &str {
    bound.as_deref().unwrap_or("None")
}

/// Evaluate the policy against the timeseries.
pub fn evaluate(
    timeseries: &[MetricsWindow],
    baseline: &MetricsWindow,
    policy: &DriftPolicy,
) -> Result<TaskOutcome> {
    policy.validate()?;

    let last = match timeseries.last() {
        Some(last) if timeseries.len() >= policy.min_windows => last,
        _ => {
            warn!(
                have = timeseries.len(),
                need = policy.min_windows,
                "drift evaluation abstained: insufficient windows"
            );
            return Ok(TaskOutcome::abstained(
                AbstainReason::InsufficientWindows {
                    have: timeseries.len(),
                    need: policy.min_windows,
                },
                "Not enough windows to evaluate drift policy.",
            ));
        }
    };

    let base_success = baseline.task_success_rate;
    let base_override = baseline.override_rate;
    let cur_success = last.task_success_rate;
    let cur_override = last.override_rate;

    let success_drop = pct_drop(base_success, cur_success);
    let override_delta = cur_override - base_override;
    // Divides by 1.0 on a zero baseline: the threshold then reads as an
    // absolute increase rather than a relative one.
    let override_increase = override_delta / if base_override != 0.0 { base_override } else { 1.0 };

    let evidence = vec![
        format!(
            "baseline success={:.2}, override={:.2}",
            base_success, base_override
        ),
        format!(
            "last window {}..{}: success={:.2} (drop {}), override={:.2}",
            display_bound(&last.window_start),
            display_bound(&last.window_end),
            cur_success,
            pct(success_drop),
            cur_override
        ),
    ];

    let mut drift_signals = Vec::new();
    if base_success != 0.0 && success_drop >= policy.task_success_drop_pct {
        drift_signals.push(format!(
            "task_success_rate drop {} >= {}",
            pct(success_drop),
            pct(policy.task_success_drop_pct)
        ));
    }
    if override_increase >= policy.override_increase_pct {
        drift_signals.push(format!(
            "override_rate increase {} >= {}",
            pct(override_delta),
            pct(policy.override_increase_pct)
        ));
    }

    let drift_detected = !drift_signals.is_empty();
    let recommended_action = if drift_detected {
        RecommendedAction::ReEvaluateAgentAndInvestigateDataShift
    } else {
        RecommendedAction::NoAction
    };

    info!(
        drift_detected,
        success_drop,
        override_increase,
        action = recommended_action.as_str(),
        "drift policy evaluated"
    );

    Ok(TaskOutcome {
        status: TaskStatus::Ok,
        result: TaskResult::Drift(DriftVerdict {
            drift_detected,
            drift_signals,
            recommended_action,
            notes: POLICY_NOTES.to_string(),
        }),
        evidence,
        notes: "Computed drift flags from metrics + policy.".to_string(),
    })
}

/// Evaluate from raw task inputs. Missing keys abstain before anything is
/// parsed; every missing key is listed.
pub fn evaluate_inputs(inputs: &Map<String, Value>, required: &[String]) -> Result<TaskOutcome> {
    let missing: Vec<String> = required
        .iter()
        .filter(|key| !inputs.contains_key(key.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "drift evaluation abstained: missing required inputs");
        return Ok(TaskOutcome::missing_inputs(missing));
    }

    let timeseries: Vec<MetricsWindow> = parse_input(inputs, TIMESERIES_KEY)?;
    let baseline: MetricsWindow = parse_input(inputs, BASELINE_KEY)?;
    let policy_doc = inputs
        .get(DRIFT_POLICY_KEY)
        .ok_or_else(|| DriftError::InvalidPolicy(format!("'{}' not supplied", DRIFT_POLICY_KEY)))?;
    let policy = DriftPolicy::from_value(policy_doc)?;

    evaluate(&timeseries, &baseline, &policy)
}

fn parse_input<T: serde::de::DeserializeOwned>(inputs: &Map<String, Value>, key: &str) -> Result<T> {
    let value = inputs.get(key).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|source| DriftError::MalformedInput {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> DriftPolicy {
        DriftPolicy {
            min_windows: 1,
            task_success_drop_pct: 0.10,
            override_increase_pct: 0.20,
        }
    }

    fn baseline() -> MetricsWindow {
        MetricsWindow::new(0.90, 0.05)
    }

    fn window(success: f64, override_rate: f64) -> MetricsWindow {
        MetricsWindow::new(success, override_rate).with_bounds("2026-01-01", "2026-01-07")
    }

    #[test]
    fn test_scenario_c_success_drop_detected() {
        let outcome = evaluate(&[window(0.75, 0.05)], &baseline(), &policy()).unwrap();
        assert_eq!(outcome.status, TaskStatus::Ok);
        let verdict = outcome.verdict().unwrap();
        assert!(verdict.drift_detected);
        assert_eq!(
            verdict.recommended_action,
            RecommendedAction::ReEvaluateAgentAndInvestigateDataShift
        );
        assert_eq!(verdict.drift_signals, vec!["task_success_rate drop 16.67% >= 10.00%"]);
    }

    #[test]
    fn test_scenario_d_no_drift() {
        let outcome = evaluate(&[window(0.89, 0.05)], &baseline(), &policy()).unwrap();
        let verdict = outcome.verdict().unwrap();
        assert!(!verdict.drift_detected);
        assert!(verdict.drift_signals.is_empty());
        assert_eq!(verdict.recommended_action, RecommendedAction::NoAction);
    }

    #[test]
    fn test_evidence_is_unconditional() {
        let outcome = evaluate(&[window(0.89, 0.05)], &baseline(), &policy()).unwrap();
        assert_eq!(
            outcome.evidence,
            vec![
                "baseline success=0.90, override=0.05".to_string(),
                "last window 2026-01-01..2026-01-07: success=0.89 (drop 1.11%), override=0.05"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_only_last_window_is_consulted() {
        let series = [window(0.10, 0.90), window(0.10, 0.90), window(0.90, 0.05)];
        let outcome = evaluate(&series, &baseline(), &policy()).unwrap();
        assert!(!outcome.verdict().unwrap().drift_detected);
    }

    #[test]
    fn test_insufficient_windows_abstains_regardless_of_values() {
        let strict = DriftPolicy {
            min_windows: 3,
            ..policy()
        };
        for series in [vec![], vec![window(0.0, 1.0)], vec![window(0.1, 0.9), window(0.1, 0.9)]] {
            let outcome = evaluate(&series, &baseline(), &strict).unwrap();
            assert_eq!(outcome.status, TaskStatus::Abstained);
            assert_eq!(
                outcome.abstain_reason(),
                Some(&AbstainReason::InsufficientWindows {
                    have: series.len(),
                    need: 3
                })
            );
            assert!(outcome.evidence.is_empty());
        }
    }

    #[test]
    fn test_zero_success_baseline_never_signals_drop() {
        let zero = MetricsWindow::new(0.0, 0.05);
        let lenient = DriftPolicy {
            task_success_drop_pct: 0.0,
            override_increase_pct: 10.0,
            ..policy()
        };
        for p in [policy(), lenient] {
            let outcome = evaluate(&[window(0.0, 0.05)], &zero, &p).unwrap();
            let verdict = outcome.verdict().unwrap();
            assert!(verdict
                .drift_signals
                .iter()
                .all(|s| !s.starts_with("task_success_rate")));
        }
    }

    #[test]
    fn test_override_increase_relative_to_baseline() {
        // 0.05 -> 0.07 is a 40% relative increase, over the 20% threshold.
        let outcome = evaluate(&[window(0.90, 0.07)], &baseline(), &policy()).unwrap();
        let verdict = outcome.verdict().unwrap();
        assert!(verdict.drift_detected);
        assert_eq!(verdict.drift_signals, vec!["override_rate increase 2.00% >= 20.00%"]);
    }

    #[test]
    fn test_zero_override_baseline_uses_absolute_increase() {
        let base = MetricsWindow::new(0.90, 0.0);
        // Absolute +0.15 stays under a 0.20 threshold...
        let quiet = evaluate(&[window(0.90, 0.15)], &base, &policy()).unwrap();
        assert!(!quiet.verdict().unwrap().drift_detected);
        // ...and +0.25 crosses it.
        let loud = evaluate(&[window(0.90, 0.25)], &base, &policy()).unwrap();
        assert!(loud.verdict().unwrap().drift_detected);
    }

    #[test]
    fn test_both_signals_in_order() {
        let outcome = evaluate(&[window(0.50, 0.50)], &baseline(), &policy()).unwrap();
        let signals = &outcome.verdict().unwrap().drift_signals;
        assert_eq!(signals.len(), 2);
        assert!(signals[0].starts_with("task_success_rate drop"));
        assert!(signals[1].starts_with("override_rate increase"));
    }

    #[test]
    fn test_missing_inputs_listed_before_parsing() {
        let mut inputs = Map::new();
        inputs.insert(BASELINE_KEY.to_string(), json!("not even an object"));
        let required = vec![
            TIMESERIES_KEY.to_string(),
            BASELINE_KEY.to_string(),
            DRIFT_POLICY_KEY.to_string(),
        ];
        let outcome = evaluate_inputs(&inputs, &required).unwrap();
        assert_eq!(outcome.status, TaskStatus::Abstained);
        assert_eq!(
            outcome.abstain_reason(),
            Some(&AbstainReason::MissingRequiredInputs {
                missing: vec![TIMESERIES_KEY.to_string(), DRIFT_POLICY_KEY.to_string()]
            })
        );
    }

    #[test]
    fn test_evaluate_inputs_end_to_end() {
        let inputs = json!({
            "production_metrics_timeseries": [
                {"window_start": "2026-02-01", "window_end": "2026-02-07",
                 "task_success_rate": 0.75, "override_rate": 0.05}
            ],
            "baseline_metrics": {"task_success_rate": 0.90, "override_rate": 0.05},
            "drift_policy": {"min_windows": 1, "task_success_drop_pct": 0.10, "override_increase_pct": 0.20}
        });
        let required = vec![
            TIMESERIES_KEY.to_string(),
            BASELINE_KEY.to_string(),
            DRIFT_POLICY_KEY.to_string(),
        ];
        let outcome = evaluate_inputs(inputs.as_object().unwrap(), &required).unwrap();
        assert!(outcome.verdict().unwrap().drift_detected);
    }

    #[test]
    fn test_malformed_timeseries_is_an_error() {
        let inputs = json!({
            "production_metrics_timeseries": [{"task_success_rate": "high"}],
            "baseline_metrics": {"task_success_rate": 0.90, "override_rate": 0.05},
            "drift_policy": {"min_windows": 1, "task_success_drop_pct": 0.10, "override_increase_pct": 0.20}
        });
        let err = evaluate_inputs(inputs.as_object().unwrap(), &[]).unwrap_err();
        assert!(matches!(err, DriftError::MalformedInput { key, .. } if key == TIMESERIES_KEY));
    }

    #[test]
    fn test_abstain_reason_serialization() {
        let value = serde_json::to_value(AbstainReason::InsufficientWindows { have: 1, need: 3 }).unwrap();
        assert_eq!(value, json!({"reason": "insufficient_windows", "have": 1, "need": 3}));
    }
}
