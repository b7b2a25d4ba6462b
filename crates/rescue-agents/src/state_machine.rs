//! Pipeline state machine — explicit states and legal transition guards.
//!
//! The orchestrator advances through `Received → Triaged → Solved →
//! Acted` and may terminate at any stage by closing the run. Every
//! transition is validated and recorded so a run's path is auditable
//! from the logs.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of pipeline states.
///
/// Every run starts at `Received` and terminates at `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Alert accepted, triage not yet run.
    Received,
    /// Triage produced a verdict.
    Triaged,
    /// Solution stage produced ranked solutions.
    Solved,
    /// Action stage executed and reported.
    Acted,
    /// Run terminated with a final outcome — terminal state.
    Closed,
}

impl PipelineState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "Received"),
            Self::Triaged => write!(f, "Triaged"),
            Self::Solved => write!(f, "Solved"),
            Self::Acted => write!(f, "Acted"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Legal transitions:
/// ```text
/// Received → Triaged
/// Triaged  → Solved
/// Solved   → Acted
/// any non-terminal → Closed
/// ```
fn is_legal_transition(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;

    // Any non-terminal state can close the run.
    if to == Closed && !from.is_terminal() {
        return true;
    }

    matches!((from, to), (Received, Triaged) | (Triaged, Solved) | (Solved, Acted))
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelineState,
    pub to: PipelineState,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal state transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks the current state, enforces legal transitions, and keeps the
/// full transition log for diagnostics.
pub struct StateMachine {
    current: PipelineState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StateMachine {
    /// Start a new run at `Received`.
    pub fn new() -> Self {
        Self {
            current: PipelineState::Received,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    /// Attempt to advance to the next state.
    pub fn advance(
        &mut self,
        to: PipelineState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(from = %self.current, to = %to, "State transition");

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Terminate the run. Always legal from non-terminal states.
    pub fn close(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(PipelineState::Closed, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// One-line history for the run-completion log.
    pub fn summary(&self) -> String {
        let states: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut summary = format!(
            "{} -> {} ({}ms, {} transitions)",
            PipelineState::Received,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !states.is_empty() {
            summary.push_str(&format!(" [{}]", states.join(" -> ")));
        }
        summary
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), PipelineState::Received);
        assert!(!sm.is_terminal());
        assert!(sm.transitions().is_empty());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::Triaged, Some("escalated")).unwrap();
        sm.advance(PipelineState::Solved, None).unwrap();
        sm.advance(PipelineState::Acted, None).unwrap();
        sm.close("run complete").unwrap();

        assert!(sm.is_terminal());
        assert_eq!(sm.transitions().len(), 4);
    }

    #[test]
    fn test_close_from_any_non_terminal_state() {
        for state in [
            PipelineState::Received,
            PipelineState::Triaged,
            PipelineState::Solved,
            PipelineState::Acted,
        ] {
            let mut sm = StateMachine {
                current: state,
                created_at: Instant::now(),
                transitions: Vec::new(),
            };
            assert!(sm.close("short circuit").is_ok());
            assert!(sm.is_terminal());
        }
    }

    #[test]
    fn test_cannot_skip_stages() {
        let mut sm = StateMachine::new();
        let err = sm.advance(PipelineState::Solved, None).unwrap_err();
        assert_eq!(err.from, PipelineState::Received);
        assert_eq!(err.to, PipelineState::Solved);
    }

    #[test]
    fn test_cannot_go_backward() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::Triaged, None).unwrap();
        assert!(sm.advance(PipelineState::Received, None).is_err());
    }

    #[test]
    fn test_cannot_transition_from_terminal() {
        let mut sm = StateMachine::new();
        sm.close("done").unwrap();
        assert!(sm.advance(PipelineState::Triaged, None).is_err());
        assert!(sm.close("again").is_err());
    }

    #[test]
    fn test_transition_record_has_reason() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::Triaged, Some("escalated")).unwrap();
        assert_eq!(sm.transitions()[0].reason.as_deref(), Some("escalated"));
    }

    #[test]
    fn test_summary_contains_path() {
        let mut sm = StateMachine::new();
        sm.advance(PipelineState::Triaged, None).unwrap();
        sm.close("no escalation").unwrap();
        let summary = sm.summary();
        assert!(summary.contains("Closed"));
        assert!(summary.contains("2 transitions"));
    }
}
