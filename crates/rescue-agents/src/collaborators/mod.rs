//! External collaborator interfaces and their HTTP reference clients.
//!
//! The pipeline core depends only on the traits defined in these
//! modules; the `Http*` clients are reference implementations wired up
//! by the binary. Every HTTP client applies the configured bounded
//! timeout per call — a timeout is indistinguishable from any other
//! transport failure, and the caller substitutes its fallback. No
//! retries anywhere.

pub mod crm;
pub mod inventory;
pub mod llm;
pub mod messaging;
pub mod orders;
pub mod payments;
pub mod policy;
pub mod secrets;
pub mod transcripts;

use std::time::Duration;

use crate::error::CollaboratorError;

/// Build a reqwest client with the pipeline-wide call timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CollaboratorError::Transport(format!("failed to build HTTP client: {e}")))
}
