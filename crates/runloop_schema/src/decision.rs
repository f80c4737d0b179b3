//! Human decisions and the final outcome they produce.

use crate::candidate::Proposal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The three terminal decisions a reviewer can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Override,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Override => "override",
            Decision::Reject => "reject",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field requirements that depend on the chosen decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("an approved category is required for {0}")]
    CategoryRequired(Decision),

    #[error("notes are required for {0}")]
    NotesRequired(Decision),

    #[error("accept must approve the proposed category '{proposed:?}', got '{approved:?}'")]
    AcceptMismatch {
        proposed: Option<String>,
        approved: Option<String>,
    },

    #[error("reject must not carry an approved category (got '{0}')")]
    CategoryOnReject(String),
}

/// A reviewer's verdict on a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanDecision {
    pub decision: Decision,
    pub approved_category: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl HumanDecision {
    /// Accept the proposal as-is. The approved category is always copied
    /// from the proposal.
    pub fn accept(proposal: &Proposal, notes: Option<&str>) -> Self {
        Self {
            decision: Decision::Accept,
            approved_category: proposal.category().map(str::to_string),
            notes: notes.map(|n| n.trim().to_string()).unwrap_or_default(),
        }
    }

    /// Replace the proposed category. Both fields must be non-blank.
    pub fn override_with(category: &str, notes: &str) -> Result<Self, DecisionError> {
        let category = category.trim();
        let notes = notes.trim();
        if category.is_empty() {
            return Err(DecisionError::CategoryRequired(Decision::Override));
        }
        if notes.is_empty() {
            return Err(DecisionError::NotesRequired(Decision::Override));
        }
        Ok(Self {
            decision: Decision::Override,
            approved_category: Some(category.to_string()),
            notes: notes.to_string(),
        })
    }

    /// Reject the proposal. A reason is mandatory.
    pub fn reject(notes: &str) -> Result<Self, DecisionError> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(DecisionError::NotesRequired(Decision::Reject));
        }
        Ok(Self {
            decision: Decision::Reject,
            approved_category: None,
            notes: notes.to_string(),
        })
    }

    /// Check a decision read back from disk against the proposal it answers.
    pub fn validate_against(&self, proposal: &Proposal) -> Result<(), DecisionError> {
        match self.decision {
            Decision::Accept => {
                if self.approved_category.as_deref() != proposal.category() {
                    return Err(DecisionError::AcceptMismatch {
                        proposed: proposal.category().map(str::to_string),
                        approved: self.approved_category.clone(),
                    });
                }
            }
            Decision::Override => {
                if self
                    .approved_category
                    .as_deref()
                    .map_or(true, |c| c.trim().is_empty())
                {
                    return Err(DecisionError::CategoryRequired(Decision::Override));
                }
                if self.notes.trim().is_empty() {
                    return Err(DecisionError::NotesRequired(Decision::Override));
                }
            }
            Decision::Reject => {
                if let Some(category) = &self.approved_category {
                    return Err(DecisionError::CategoryOnReject(category.clone()));
                }
                if self.notes.trim().is_empty() {
                    return Err(DecisionError::NotesRequired(Decision::Reject));
                }
            }
        }
        Ok(())
    }
}

/// The category acted upon after the gate. Only derivable from a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalOutcome {
    pub category: Option<String>,
    pub human_decision: Decision,
}

impl FinalOutcome {
    pub fn from_decision(human: &HumanDecision) -> Self {
        let category = match human.decision {
            Decision::Accept | Decision::Override => human.approved_category.clone(),
            Decision::Reject => None,
        };
        Self {
            category,
            human_decision: human.decision,
        }
    }
}
