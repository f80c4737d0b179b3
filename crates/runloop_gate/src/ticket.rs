//! Request/response boundary for the gate.
//!
//! `submit` parks a proposal behind a ticket; `resolve` answers it. Whatever
//! surface collects the reviewer's answer (console, API, UI) only ever talks
//! to these two calls.

use crate::{GateError, GateMachine, GateState, GateTransition};
use runloop_ids::TicketId;
use runloop_schema::{HumanDecision, Proposal};
use std::collections::HashMap;
use tracing::{info, warn};

/// A proposal waiting for a reviewer.
#[derive(Debug, Clone)]
pub struct GateTicket {
    pub id: TicketId,
    pub proposal: Proposal,
}

impl GateTicket {
    /// Text shown to the reviewer when the gate is entered.
    pub fn prompt(&self) -> String {
        format!(
            "Proposed category: {}\nRationale: {}",
            self.proposal.category().unwrap_or("None"),
            self.proposal.rationale()
        )
    }
}

/// A reviewer's answer to a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResponse {
    Accept { notes: Option<String> },
    Override { category: String, notes: String },
    Reject { notes: String },
}

/// Terminal result of a ticket.
#[derive(Debug, Clone)]
pub struct GateResolution {
    pub ticket: TicketId,
    pub state: GateState,
    pub decision: HumanDecision,
    pub transitions: Vec<GateTransition>,
}

struct Pending {
    proposal: Proposal,
    machine: GateMachine,
}

/// Holds tickets between submission and resolution.
#[derive(Default)]
pub struct HumanGate {
    pending: HashMap<TicketId, Pending>,
    reviewer: Option<String>,
}

impl HumanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record who resolves tickets on this gate.
    pub fn with_reviewer(mut self, reviewer: impl Into<String>) -> Self {
        self.reviewer = Some(reviewer.into());
        self
    }

    pub fn submit(&mut self, proposal: Proposal) -> GateTicket {
        let id = TicketId::new();
        info!(
            ticket = %id,
            category = proposal.category().unwrap_or("None"),
            abstain = proposal.abstain(),
            "proposal submitted to human gate"
        );
        self.pending.insert(
            id,
            Pending {
                proposal: proposal.clone(),
                machine: GateMachine::new(),
            },
        );
        GateTicket { id, proposal }
    }

    pub fn is_pending(&self, ticket: &TicketId) -> bool {
        self.pending.contains_key(ticket)
    }

    pub fn state(&self, ticket: &TicketId) -> Option<GateState> {
        self.pending.get(ticket).map(|p| p.machine.current())
    }

    /// Answer a ticket. On a field error the ticket stays pending so the
    /// reviewer can be asked again.
    pub fn resolve(
        &mut self,
        ticket: &TicketId,
        response: GateResponse,
    ) -> Result<GateResolution, GateError> {
        let pending = self
            .pending
            .get_mut(ticket)
            .ok_or(GateError::UnknownTicket(*ticket))?;

        let decision = match response {
            GateResponse::Accept { notes } => HumanDecision::accept(&pending.proposal, notes.as_deref()),
            GateResponse::Override { category, notes } => {
                HumanDecision::override_with(&category, &notes).map_err(|e| {
                    warn!(ticket = %ticket, error = %e, "override refused");
                    e
                })?
            }
            GateResponse::Reject { notes } => HumanDecision::reject(&notes).map_err(|e| {
                warn!(ticket = %ticket, error = %e, "reject refused");
                e
            })?,
        };

        let to = GateState::for_decision(decision.decision);
        let reason = (!decision.notes.is_empty()).then(|| decision.notes.clone());
        pending
            .machine
            .transition_with_reason(to, reason, self.reviewer.clone())?;

        let transitions = pending.machine.history().to_vec();
        self.pending.remove(ticket);

        info!(ticket = %ticket, state = %to, "human gate resolved");
        Ok(GateResolution {
            ticket: *ticket,
            state: to,
            decision,
            transitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_schema::{Candidate, Decision, DecisionError};

    fn proposal() -> Proposal {
        Candidate::classified("network", 0.6, "timeouts | dns").unwrap()
    }

    #[test]
    fn test_accept_uses_proposal_category() {
        let mut gate = HumanGate::new();
        let ticket = gate.submit(proposal());
        assert_eq!(gate.state(&ticket.id), Some(GateState::AwaitingInput));

        let res = gate
            .resolve(&ticket.id, GateResponse::Accept { notes: None })
            .unwrap();
        assert_eq!(res.state, GateState::Accepted);
        assert_eq!(res.decision.decision, Decision::Accept);
        assert_eq!(res.decision.approved_category.as_deref(), Some("network"));
        assert_eq!(res.transitions.len(), 1);
        assert!(!gate.is_pending(&ticket.id));
    }

    #[test]
    fn test_override_without_notes_stays_pending() {
        let mut gate = HumanGate::new();
        let ticket = gate.submit(proposal());

        let err = gate
            .resolve(
                &ticket.id,
                GateResponse::Override {
                    category: "disk".into(),
                    notes: " ".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::Decision(DecisionError::NotesRequired(Decision::Override))
        ));
        assert_eq!(gate.state(&ticket.id), Some(GateState::AwaitingInput));

        let res = gate
            .resolve(
                &ticket.id,
                GateResponse::Override {
                    category: "disk".into(),
                    notes: "SMART errors in the artifact".into(),
                },
            )
            .unwrap();
        assert_eq!(res.state, GateState::Overridden);
        assert_eq!(res.decision.approved_category.as_deref(), Some("disk"));
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut gate = HumanGate::new().with_reviewer("ops-lead");
        let ticket = gate.submit(proposal());
        assert!(gate
            .resolve(&ticket.id, GateResponse::Reject { notes: String::new() })
            .is_err());
        let res = gate
            .resolve(&ticket.id, GateResponse::Reject { notes: "stale log".into() })
            .unwrap();
        assert_eq!(res.decision.approved_category, None);
        assert_eq!(res.transitions[0].actor.as_deref(), Some("ops-lead"));
        assert_eq!(res.transitions[0].reason.as_deref(), Some("stale log"));
    }

    #[test]
    fn test_resolved_ticket_cannot_be_resolved_again() {
        let mut gate = HumanGate::new();
        let ticket = gate.submit(proposal());
        gate.resolve(&ticket.id, GateResponse::Accept { notes: None })
            .unwrap();
        assert!(matches!(
            gate.resolve(&ticket.id, GateResponse::Reject { notes: "late".into() }),
            Err(GateError::UnknownTicket(_))
        ));
    }

    #[test]
    fn test_prompt_shows_category_and_rationale() {
        let mut gate = HumanGate::new();
        let ticket = gate.submit(Candidate::abstention(0.0, "Swarm disagreement").unwrap());
        let prompt = ticket.prompt();
        assert!(prompt.contains("Proposed category: None"));
        assert!(prompt.contains("Rationale: Swarm disagreement"));
    }
}
