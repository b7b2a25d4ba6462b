//! Pipeline stages and the seams the orchestrator sequences them by.
//!
//! Each stage is a pure input→output transformation: it catches its own
//! internal faults and always returns a typed result. The orchestrator
//! depends only on these traits, so its sequencing and short-circuit
//! logic is testable against stub stages.

pub mod action;
pub mod solution;
pub mod triage;

pub use action::ActionStage;
pub use solution::SolutionStage;
pub use triage::TriageStage;

use async_trait::async_trait;

use crate::contracts::{ActionReport, Alert, CaseFile, SolutionSet, TriageVerdict};

/// Decide whether an alert warrants escalation.
#[async_trait]
pub trait Triage: Send + Sync {
    async fn process(&self, alert: &Alert) -> TriageVerdict;
}

/// Produce ranked remediation solutions for an escalated case.
#[async_trait]
pub trait Solve: Send + Sync {
    async fn process(&self, case_file: &CaseFile) -> SolutionSet;
}

/// Execute the top-ranked solution and notify the customer.
#[async_trait]
pub trait Act: Send + Sync {
    async fn process(&self, case_file: &CaseFile, solutions: &SolutionSet) -> ActionReport;
}
