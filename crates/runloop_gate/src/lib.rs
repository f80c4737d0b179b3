//! Human gate state machine.
//!
//! Canonical definitions for GateState and its transitions. A proposal enters
//! the gate in `AWAITING_INPUT` and leaves through exactly one of three
//! terminal states. There is no timeout and no automatic resolution.

use chrono::{DateTime, Utc};
use runloop_ids::TicketId;
use runloop_schema::{Decision, DecisionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod console;
pub mod ticket;

pub use console::{parse_choice, prompt_decision, GateChoice};
pub use ticket::{GateResolution, GateResponse, GateTicket, HumanGate};

// ============================================================================
// Gate State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    /// Proposal shown, waiting for the reviewer
    AwaitingInput,
    /// Terminal: proposal category approved as-is
    Accepted,
    /// Terminal: reviewer supplied a different category with justification
    Overridden,
    /// Terminal: proposal rejected with a reason
    Rejected,
}

impl GateState {
    pub const ALL: [GateState; 4] = [
        GateState::AwaitingInput,
        GateState::Accepted,
        GateState::Overridden,
        GateState::Rejected,
    ];

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::AwaitingInput => "AWAITING_INPUT",
            GateState::Accepted => "ACCEPTED",
            GateState::Overridden => "OVERRIDDEN",
            GateState::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GateState::AwaitingInput)
    }

    /// Terminal state reached by a decision.
    pub fn for_decision(decision: Decision) -> Self {
        match decision {
            Decision::Accept => GateState::Accepted,
            Decision::Override => GateState::Overridden,
            Decision::Reject => GateState::Rejected,
        }
    }

    pub fn valid_transitions(&self) -> &'static [GateState] {
        match self {
            GateState::AwaitingInput => &[
                GateState::Accepted,
                GateState::Overridden,
                GateState::Rejected,
            ],
            GateState::Accepted | GateState::Overridden | GateState::Rejected => &[],
        }
    }

    pub fn can_transition_to(&self, target: GateState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when parsing a GateState from string.
#[derive(Debug, Error, Clone)]
#[error("invalid gate state: {0}")]
pub struct StateParseError(String);

impl std::str::FromStr for GateState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| StateParseError(s.to_string()))
    }
}

// ============================================================================
// State Transition
// ============================================================================

/// A state transition event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateTransition {
    pub from: GateState,
    pub to: GateState,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl GateTransition {
    pub fn new(from: GateState, to: GateState) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
            reason: None,
            actor: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: GateState, to: GateState },

    #[error("gate is terminal: {0}")]
    TerminalState(GateState),

    #[error("no pending gate ticket {0}")]
    UnknownTicket(TicketId),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("reviewer input closed before the gate reached a terminal state")]
    InputClosed,

    #[error("gate I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// State Machine
// ============================================================================

/// State machine for one proposal's trip through the gate.
#[derive(Debug, Clone)]
pub struct GateMachine {
    current: GateState,
    history: Vec<GateTransition>,
}

impl GateMachine {
    /// Create a new state machine awaiting reviewer input.
    pub fn new() -> Self {
        Self {
            current: GateState::AwaitingInput,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> GateState {
        self.current
    }

    pub fn history(&self) -> &[GateTransition] {
        &self.history
    }

    pub fn transition(&mut self, to: GateState) -> Result<GateTransition, GateError> {
        self.transition_with_reason(to, None, None)
    }

    pub fn transition_with_reason(
        &mut self,
        to: GateState,
        reason: Option<String>,
        actor: Option<String>,
    ) -> Result<GateTransition, GateError> {
        if self.current.is_terminal() {
            return Err(GateError::TerminalState(self.current));
        }

        if !self.current.can_transition_to(to) {
            return Err(GateError::InvalidTransition {
                from: self.current,
                to,
            });
        }

        let mut transition = GateTransition::new(self.current, to);
        if let Some(r) = reason {
            transition = transition.with_reason(r);
        }
        if let Some(a) = actor {
            transition = transition.with_actor(a);
        }

        self.current = to;
        self.history.push(transition.clone());

        Ok(transition)
    }
}

impl Default for GateMachine {
    fn default() -> Self {
        Self::new()
    }
}
