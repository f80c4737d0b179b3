//! The classification output contract.
//!
//! Contract:
//! - Outputs are limited to: category, confidence, rationale, abstain.
//! - If abstain=true, category MUST be absent.
//! - If abstain=false, category MUST be present and non-blank.
//! - confidence is bounded to [0.0, 1.0].
//!
//! Validation runs at construction and on deserialisation, so a `Candidate`
//! value in hand always satisfies the contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Violations of the candidate contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("confidence must be within [0.0, 1.0], got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("rationale must not be empty")]
    EmptyRationale,

    #[error("category must be null when abstain=true (got '{0}')")]
    CategoryWithAbstain(String),

    #[error("category is required when abstain=false")]
    MissingCategory,
}

/// One classifier's opinion about an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CandidateFields")]
pub struct Candidate {
    pub(crate) category: Option<String>,
    pub(crate) confidence: f64,
    pub(crate) rationale: String,
    pub(crate) abstain: bool,
}

/// The aggregated result of one or more candidates. Same shape and contract.
pub type Proposal = Candidate;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CandidateFields {
    #[serde(default)]
    category: Option<String>,
    confidence: f64,
    rationale: String,
    abstain: bool,
}

impl TryFrom<CandidateFields> for Candidate {
    type Error = SchemaError;

    fn try_from(fields: CandidateFields) -> Result<Self, Self::Error> {
        Candidate::new(fields.category, fields.confidence, fields.rationale, fields.abstain)
    }
}

impl Candidate {
    /// Build a candidate, enforcing the contract.
    pub fn new(
        category: Option<String>,
        confidence: f64,
        rationale: impl Into<String>,
        abstain: bool,
    ) -> Result<Self, SchemaError> {
        let candidate = Self {
            category,
            confidence,
            rationale: rationale.into(),
            abstain,
        };
        candidate.validate()?;
        Ok(candidate)
    }

    /// A committed classification.
    pub fn classified(
        category: impl Into<String>,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        Self::new(Some(category.into()), confidence, rationale, false)
    }

    /// An explicit refusal to commit to a category.
    pub fn abstention(confidence: f64, rationale: impl Into<String>) -> Result<Self, SchemaError> {
        Self::new(None, confidence, rationale, true)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        // NaN fails the range check as well.
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SchemaError::ConfidenceOutOfRange(self.confidence));
        }
        if self.rationale.trim().is_empty() {
            return Err(SchemaError::EmptyRationale);
        }
        match (&self.category, self.abstain) {
            (Some(category), true) => Err(SchemaError::CategoryWithAbstain(category.clone())),
            (None, false) => Err(SchemaError::MissingCategory),
            (Some(category), false) if category.trim().is_empty() => {
                Err(SchemaError::MissingCategory)
            }
            _ => Ok(()),
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn abstain(&self) -> bool {
        self.abstain
    }
}

/// JSON schema handed to the classifier as the structured-output contract.
pub fn candidate_json_schema() -> serde_json::Value {
    serde_json::json!({
        "title": "ClassificationOutput",
        "type": "object",
        "properties": {
            "category": {
                "type": ["string", "null"],
                "description": "Chosen taxonomy category. Must be null when abstain=true."
            },
            "confidence": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "description": "Model confidence in the category assignment (0.0-1.0)."
            },
            "rationale": {
                "type": "string",
                "minLength": 1,
                "description": "Brief, bounded rationale grounded in the provided artifact."
            },
            "abstain": {
                "type": "boolean",
                "description": "True when the model cannot confidently classify within the taxonomy."
            }
        },
        "required": ["category", "confidence", "rationale", "abstain"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_classification() {
        let c = Candidate::classified("network", 0.8, "packet loss in logs").unwrap();
        assert_eq!(c.category(), Some("network"));
        assert!(!c.abstain());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(Candidate::classified("x", 0.0, "r").is_ok());
        assert!(Candidate::classified("x", 1.0, "r").is_ok());
        assert_eq!(
            Candidate::classified("x", 1.01, "r"),
            Err(SchemaError::ConfidenceOutOfRange(1.01))
        );
        assert!(matches!(
            Candidate::classified("x", -0.1, "r"),
            Err(SchemaError::ConfidenceOutOfRange(_))
        ));
        assert!(Candidate::classified("x", f64::NAN, "r").is_err());
    }

    #[test]
    fn test_rationale_required() {
        assert_eq!(
            Candidate::classified("x", 0.5, "   "),
            Err(SchemaError::EmptyRationale)
        );
    }

    #[test]
    fn test_abstain_category_coupling() {
        assert_eq!(
            Candidate::new(Some("x".into()), 0.5, "r", true),
            Err(SchemaError::CategoryWithAbstain("x".into()))
        );
        assert_eq!(
            Candidate::new(None, 0.5, "r", false),
            Err(SchemaError::MissingCategory)
        );
        assert_eq!(
            Candidate::new(Some("  ".into()), 0.5, "r", false),
            Err(SchemaError::MissingCategory)
        );
        assert!(Candidate::abstention(0.2, "out of taxonomy").is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Candidate = serde_json::from_str(
            r#"{"category":"disk","confidence":0.7,"rationale":"r","abstain":false}"#,
        )
        .unwrap();
        assert_eq!(ok.category(), Some("disk"));

        let missing_category: Result<Candidate, _> =
            serde_json::from_str(r#"{"confidence":0.7,"rationale":"r","abstain":true}"#);
        assert!(missing_category.unwrap().abstain());

        let bad: Result<Candidate, _> = serde_json::from_str(
            r#"{"category":"disk","confidence":0.7,"rationale":"r","abstain":true}"#,
        );
        assert!(bad.is_err());

        let extra: Result<Candidate, _> = serde_json::from_str(
            r#"{"category":"disk","confidence":0.7,"rationale":"r","abstain":false,"score":3}"#,
        );
        assert!(extra.is_err());
    }

    #[test]
    fn test_serialize_keeps_null_category() {
        let c = Candidate::abstention(0.0, "unsure").unwrap();
        let value = serde_json::to_value(&c).unwrap();
        assert!(value["category"].is_null());
        assert_eq!(value["abstain"], true);
    }

    #[test]
    fn test_schema_lists_all_fields() {
        let schema = candidate_json_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
        assert_eq!(schema["additionalProperties"], false);
    }
}
