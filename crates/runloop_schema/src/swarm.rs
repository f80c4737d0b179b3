//! Swarm aggregation rule (locked).
//!
//! - Any abstaining candidate => abstain.
//! - Any disagreement between categories => abstain.
//! - Full agreement => the shared category at the minimum confidence, with
//!   rationales joined in issuance order.

use crate::candidate::{Candidate, Proposal};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

pub const ABSTENTION_RATIONALE: &str = "Swarm disagreement/abstention";
pub const DISAGREEMENT_RATIONALE: &str = "Swarm disagreement";
const RATIONALE_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("cannot aggregate an empty swarm")]
    EmptySwarm,
}

/// Which branch of the rule produced the proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwarmOutcome {
    /// A swarm of one: the candidate is the proposal.
    Single,
    Agreement,
    Abstention,
    Disagreement,
}

impl SwarmOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwarmOutcome::Single => "single",
            SwarmOutcome::Agreement => "agreement",
            SwarmOutcome::Abstention => "abstention",
            SwarmOutcome::Disagreement => "disagreement",
        }
    }
}

/// Reduce an ordered, non-empty swarm to one proposal.
pub fn aggregate(candidates: &[Candidate]) -> Result<Proposal, AggregateError> {
    aggregate_with_outcome(candidates).map(|(proposal, _)| proposal)
}

pub fn aggregate_with_outcome(
    candidates: &[Candidate],
) -> Result<(Proposal, SwarmOutcome), AggregateError> {
    match candidates {
        [] => Err(AggregateError::EmptySwarm),
        [single] => Ok((single.clone(), SwarmOutcome::Single)),
        _ => Ok(agree_or_abstain(candidates)),
    }
}

fn agree_or_abstain(candidates: &[Candidate]) -> (Proposal, SwarmOutcome) {
    if candidates.iter().any(Candidate::abstain) {
        debug!(size = candidates.len(), "swarm member abstained");
        return (abstained(ABSTENTION_RATIONALE), SwarmOutcome::Abstention);
    }

    let categories: BTreeSet<&str> = candidates.iter().filter_map(Candidate::category).collect();
    let shared = match categories.iter().next() {
        Some(only) if categories.len() == 1 => only.to_string(),
        _ => {
            debug!(?categories, "swarm disagreed");
            return (abstained(DISAGREEMENT_RATIONALE), SwarmOutcome::Disagreement);
        }
    };

    let confidence = candidates
        .iter()
        .map(Candidate::confidence)
        .fold(f64::INFINITY, f64::min);
    let rationale = candidates
        .iter()
        .map(|c| c.rationale().trim())
        .collect::<Vec<_>>()
        .join(RATIONALE_SEPARATOR);

    // Valid inputs yield a valid proposal: the shared category is non-blank,
    // the minimum stays in [0, 1] and the joined rationale is non-empty.
    let proposal = Candidate {
        category: Some(shared),
        confidence,
        rationale,
        abstain: false,
    };
    (proposal, SwarmOutcome::Agreement)
}

fn abstained(rationale: &str) -> Proposal {
    Candidate {
        category: None,
        confidence: 0.0,
        rationale: rationale.to_string(),
        abstain: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(category: &str, confidence: f64) -> Candidate {
        Candidate::classified(category, confidence, format!("saw {}", category)).unwrap()
    }

    #[test]
    fn test_empty_swarm_is_an_error() {
        assert_eq!(aggregate(&[]), Err(AggregateError::EmptySwarm));
    }

    #[test]
    fn test_single_candidate_passes_through() {
        let only = Candidate::abstention(0.4, "unclear").unwrap();
        let (proposal, outcome) = aggregate_with_outcome(&[only.clone()]).unwrap();
        assert_eq!(proposal, only);
        assert_eq!(outcome, SwarmOutcome::Single);
    }

    #[test]
    fn test_scenario_a_agreement_takes_min_confidence() {
        let proposal = aggregate(&[cat("X", 0.9), cat("X", 0.6)]).unwrap();
        assert_eq!(proposal.category(), Some("X"));
        assert_eq!(proposal.confidence(), 0.6);
        assert!(!proposal.abstain());
        assert_eq!(proposal.rationale(), "saw X | saw X");
    }

    #[test]
    fn test_scenario_b_disagreement_abstains() {
        let (proposal, outcome) = aggregate_with_outcome(&[cat("X", 0.9), cat("Y", 0.9)]).unwrap();
        assert!(proposal.abstain());
        assert_eq!(proposal.category(), None);
        assert_eq!(proposal.confidence(), 0.0);
        assert_eq!(proposal.rationale(), DISAGREEMENT_RATIONALE);
        assert_eq!(outcome, SwarmOutcome::Disagreement);
    }

    #[test]
    fn test_any_abstention_abstains() {
        let swarms = [
            vec![cat("X", 0.9), Candidate::abstention(0.9, "no").unwrap()],
            vec![Candidate::abstention(0.1, "no").unwrap(), cat("X", 0.9), cat("X", 0.8)],
            vec![
                Candidate::abstention(0.1, "a").unwrap(),
                Candidate::abstention(0.2, "b").unwrap(),
            ],
        ];
        for swarm in swarms {
            let proposal = aggregate(&swarm).unwrap();
            assert!(proposal.abstain());
            assert_eq!(proposal.category(), None);
            assert_eq!(proposal.confidence(), 0.0);
            assert_eq!(proposal.rationale(), ABSTENTION_RATIONALE);
        }
    }

    #[test]
    fn test_rationale_preserves_issuance_order() {
        let swarm = [
            Candidate::classified("X", 0.5, " first ").unwrap(),
            Candidate::classified("X", 0.7, "second").unwrap(),
            Candidate::classified("X", 0.9, "third").unwrap(),
        ];
        let proposal = aggregate(&swarm).unwrap();
        assert_eq!(proposal.rationale(), "first | second | third");
        assert_eq!(proposal.confidence(), 0.5);
    }

    #[test]
    fn test_category_set_is_order_independent() {
        let forward = aggregate(&[cat("X", 0.9), cat("Y", 0.8), cat("X", 0.7)]).unwrap();
        let backward = aggregate(&[cat("X", 0.7), cat("Y", 0.8), cat("X", 0.9)]).unwrap();
        assert_eq!(forward, backward);
    }
}
