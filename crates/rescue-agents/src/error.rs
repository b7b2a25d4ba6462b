//! Error taxonomy for the rescue pipeline.
//!
//! Three classes with different propagation rules:
//! - [`CollaboratorError`] — an external system misbehaved. Mapped to a
//!   negative/default verdict at the stage boundary, never escalated to
//!   a process-level fault.
//! - [`DecisionError`] — the generative model produced unusable output
//!   (or was unreachable). Mapped to a stage-specific deterministic
//!   fallback.
//! - [`AlertError`] — the inbound event itself is malformed. Rejected
//!   before the pipeline starts.
//!
//! Contract violations (an upstream stage breaking its own invariant)
//! are NOT represented here — the orchestrator detects them directly
//! and terminates the run with an error outcome, because silently
//! defaulting them would hide a bug in a safety-critical decision path.

use thiserror::Error;

/// Failure talking to an external collaborator (CRM, payments, etc.).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Transport-level failure: unreachable, timeout, or HTTP error status.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The collaborator answered but the payload was not the expected shape.
    #[error("unexpected payload: {0}")]
    Payload(String),

    /// A required credential could not be fetched.
    #[error("credential unavailable: {0}")]
    Credential(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Failure obtaining a structured decision from the generative model.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The model call itself failed (collaborator transport error).
    #[error("LLM error: {0}")]
    Transport(String),

    /// The model answered but the text did not parse as the expected JSON.
    #[error("Analysis error: {0}")]
    Malformed(String),

    /// The text parsed but failed shape validation. Partially-validated
    /// structured data is never passed through.
    #[error("Analysis error: {0}")]
    Invalid(String),
}

/// Inbound alert event rejected before the pipeline starts.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {detail}")]
    InvalidField { field: &'static str, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_error_reason_prefixes() {
        let transport = DecisionError::Transport("connection refused".into());
        assert!(transport.to_string().starts_with("LLM error:"));

        let malformed = DecisionError::Malformed("expected value at line 1".into());
        assert!(malformed.to_string().starts_with("Analysis error:"));

        let invalid = DecisionError::Invalid("escalation missing case file".into());
        assert!(invalid.to_string().starts_with("Analysis error:"));
    }

    #[test]
    fn test_alert_error_display() {
        let err = AlertError::MissingField("customer_id");
        assert_eq!(err.to_string(), "missing required field: customer_id");
    }
}
