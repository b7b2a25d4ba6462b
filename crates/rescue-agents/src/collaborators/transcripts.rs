//! Transcript-store collaborator: fetch a conversation transcript by id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{CachedSecret, SecretStore, TRANSCRIPT_API_KEY};
use crate::error::CollaboratorError;

/// Transcript store contract. `Ok(None)` means not found.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn fetch(&self, transcript_id: &str) -> Result<Option<String>, CollaboratorError>;
}

/// HTTP transcript store.
pub struct HttpTranscriptStore {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl HttpTranscriptStore {
    pub fn new(
        base_url: &str,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secrets,
            api_key: CachedSecret::new(TRANSCRIPT_API_KEY),
        })
    }
}

#[async_trait]
impl TranscriptStore for HttpTranscriptStore {
    async fn fetch(&self, transcript_id: &str) -> Result<Option<String>, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/transcripts/{transcript_id}", self.base_url);

        info!(transcript_id, "Fetching transcript");
        let resp = self.client.get(&url).bearer_auth(api_key).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "transcript store returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        Ok(data
            .get("transcript_text")
            .and_then(Value::as_str)
            .map(String::from))
    }
}
