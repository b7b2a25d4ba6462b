//! Orchestration: sequence the three stages over one alert.
//!
//! `Received → Triaged → Solved → Acted`, terminating at any stage with
//! a final [`OutcomeRecord`]. Short-circuits: a declined triage verdict
//! ends the run with `no_action_required`; an empty solution list ends
//! it with an error; an action-stage failure is surfaced as data inside
//! a `success` outcome, because a degraded remediation (escalation to a
//! human, templated communication) is still a meaningful outcome.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::contracts::{Alert, OutcomeRecord, TriageVerdict};
use crate::error::AlertError;
use crate::stages::{Act, Solve, Triage};
use crate::state_machine::{PipelineState, StateMachine};

pub struct Orchestrator {
    triage: Arc<dyn Triage>,
    solution: Arc<dyn Solve>,
    action: Arc<dyn Act>,
}

impl Orchestrator {
    pub fn new(triage: Arc<dyn Triage>, solution: Arc<dyn Solve>, action: Arc<dyn Act>) -> Self {
        Self {
            triage,
            solution,
            action,
        }
    }

    /// Validate a raw inbound event and run the pipeline on it.
    ///
    /// A malformed event is rejected before the pipeline starts.
    pub async fn process_event(&self, event: &Value) -> Result<OutcomeRecord, AlertError> {
        let alert = Alert::from_event(event)?;
        Ok(self.process_alert(&alert).await)
    }

    /// Run one alert start-to-finish. Never panics and never returns a
    /// transport-level error: the worst outcome is `status = error`.
    pub async fn process_alert(&self, alert: &Alert) -> OutcomeRecord {
        let mut machine = StateMachine::new();
        info!(customer_id = %alert.customer_id, "Processing alert");

        let verdict = self.triage.process(alert).await;
        self.step(&mut machine, PipelineState::Triaged, None);

        let case_file = match verdict {
            TriageVerdict::Declined { reason } => {
                info!(reason = %reason, "No escalation needed");
                self.finish(&mut machine, "no escalation");
                return OutcomeRecord::no_action_required(&alert.customer_id, reason);
            }
            TriageVerdict::Escalated { case_file } => case_file,
        };

        // Defensive re-check of the invariant triage is supposed to
        // uphold. A violation here indicates a triage bug, which must
        // surface as an error rather than be silently defaulted.
        if !case_file.is_complete() {
            error!(customer_id = %alert.customer_id, "Triage escalated with incomplete case file");
            self.finish(&mut machine, "contract violation");
            return OutcomeRecord::error(Some(&alert.customer_id), "Invalid triage result");
        }

        let solutions = self.solution.process(&case_file).await;
        self.step(&mut machine, PipelineState::Solved, None);

        if solutions.ranked_solutions.is_empty() {
            error!(customer_id = %alert.customer_id, "Solution stage produced no solutions");
            self.finish(&mut machine, "no solutions");
            return OutcomeRecord::error(Some(&alert.customer_id), "No solutions generated");
        }

        let actions_taken = self.action.process(&case_file, &solutions).await;
        self.step(&mut machine, PipelineState::Acted, None);

        self.finish(&mut machine, "run complete");
        info!(
            customer_id = %alert.customer_id,
            path = %machine.summary(),
            "Customer experience rescue completed"
        );
        OutcomeRecord::success(&alert.customer_id, case_file, solutions, actions_taken)
    }

    fn step(&self, machine: &mut StateMachine, to: PipelineState, reason: Option<&str>) {
        if let Err(e) = machine.advance(to, reason) {
            warn!(error = %e, "State machine rejected transition");
        }
    }

    fn finish(&self, machine: &mut StateMachine, reason: &str) {
        if let Err(e) = machine.close(reason) {
            warn!(error = %e, "State machine rejected close");
        }
    }
}
