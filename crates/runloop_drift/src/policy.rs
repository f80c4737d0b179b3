//! Policy and metrics documents.

use crate::{DriftError, Result};
use serde::{Deserialize, Serialize};

/// Thresholds for one drift policy version. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftPolicy {
    /// Minimum number of windows before the policy is evaluated at all
    pub min_windows: usize,
    /// Relative drop in task success rate that counts as drift (0.10 = 10%)
    pub task_success_drop_pct: f64,
    /// Increase in override rate that counts as drift, relative to the
    /// baseline override rate (absolute when the baseline is zero)
    pub override_increase_pct: f64,
}

impl DriftPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.min_windows < 1 {
            return Err(DriftError::InvalidPolicy(format!(
                "min_windows must be >= 1, got {}",
                self.min_windows
            )));
        }
        for (name, value) in [
            ("task_success_drop_pct", self.task_success_drop_pct),
            ("override_increase_pct", self.override_increase_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DriftError::InvalidPolicy(format!(
                    "{} must be a finite value >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Parse a policy document; any missing field is a configuration error.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let policy: DriftPolicy = serde_json::from_value(value.clone())
            .map_err(|e| DriftError::InvalidPolicy(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }
}

/// One window of production metrics. Baselines use the same shape without
/// the window bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<String>,
    pub task_success_rate: f64,
    pub override_rate: f64,
}

impl MetricsWindow {
    pub fn new(task_success_rate: f64, override_rate: f64) -> Self {
        Self {
            window_start: None,
            window_end: None,
            task_success_rate,
            override_rate,
        }
    }

    pub fn with_bounds(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.window_start = Some(start.into());
        self.window_end = Some(end.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_from_complete_document() {
        let policy = DriftPolicy::from_value(&json!({
            "min_windows": 2,
            "task_success_drop_pct": 0.1,
            "override_increase_pct": 0.2
        }))
        .unwrap();
        assert_eq!(policy.min_windows, 2);
    }

    #[test]
    fn test_policy_missing_field_is_configuration_error() {
        let err = DriftPolicy::from_value(&json!({
            "min_windows": 1,
            "task_success_drop_pct": 0.1
        }))
        .unwrap_err();
        assert!(matches!(err, DriftError::InvalidPolicy(msg) if msg.contains("override_increase_pct")));
    }

    #[test]
    fn test_policy_bounds() {
        let mut policy = DriftPolicy {
            min_windows: 0,
            task_success_drop_pct: 0.1,
            override_increase_pct: 0.2,
        };
        assert!(policy.validate().is_err());
        policy.min_windows = 1;
        assert!(policy.validate().is_ok());
        policy.override_increase_pct = -0.01;
        assert!(policy.validate().is_err());
        policy.override_increase_pct = f64::NAN;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_window_bounds_are_optional() {
        let baseline: MetricsWindow =
            serde_json::from_value(json!({"task_success_rate": 0.9, "override_rate": 0.05}))
                .unwrap();
        assert_eq!(baseline.window_start, None);
        let missing: std::result::Result<MetricsWindow, _> =
            serde_json::from_value(json!({"task_success_rate": 0.9}));
        assert!(missing.is_err());
    }
}
