//! Classification Contract
//!
//! # Philosophy: propose, then approve
//!
//! A classifier never decides anything on its own. Its output is a
//! [`Candidate`]: a category (or an explicit abstention), a bounded
//! confidence and a rationale. Candidates from a swarm are reduced to a single
//! [`Proposal`] by a locked rule, and only a [`HumanDecision`] turns that
//! proposal into a [`FinalOutcome`].
//!
//! # Modules
//!
//! - [`candidate`]: the four-field contract and its validation
//! - [`decision`]: human decisions and the derived final outcome
//! - [`swarm`]: disagreement-implies-abstain aggregation

pub mod candidate;
pub mod decision;
pub mod swarm;

pub use candidate::{candidate_json_schema, Candidate, Proposal, SchemaError};
pub use decision::{Decision, DecisionError, FinalOutcome, HumanDecision};
pub use swarm::{aggregate, aggregate_with_outcome, AggregateError, SwarmOutcome};
