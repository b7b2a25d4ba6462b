//! Text-generation collaborator: prompt in, free text out.
//!
//! No session state, no conversation memory — each call is independent.
//! The HTTP client targets an OpenAI-compatible chat-completions
//! endpoint; model selection happens via the model name in the request
//! body.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{CachedSecret, SecretStore, LLM_API_KEY};
use crate::config::LlmEndpoint;
use crate::error::CollaboratorError;

/// Generative model contract: `generate(prompt) -> text`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl OpenAiGenerator {
    pub fn new(
        endpoint: &LlmEndpoint,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            secrets,
            api_key: CachedSecret::new(LLM_API_KEY),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling generative model");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "model endpoint returned {status}: {text}"
            )));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        let content = data["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| CollaboratorError::Payload("no content in response".into()))?;

        Ok(content.to_string())
    }
}
