//! Customer-record collaborator: profile lookup, resolution notes, and
//! account credits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{CachedSecret, SecretStore, CRM_API_KEY};
use crate::contracts::{CustomerProfile, ExecutionResult};
use crate::error::CollaboratorError;

/// CRM contract consumed by the pipeline.
#[async_trait]
pub trait CustomerRecords: Send + Sync {
    /// `Ok(None)` means the customer does not exist — never an error.
    async fn lookup(&self, customer_id: &str) -> Result<Option<CustomerProfile>, CollaboratorError>;

    /// Append a note to the customer record; `Ok(true)` on acceptance.
    async fn append_note(&self, customer_id: &str, note: &str) -> Result<bool, CollaboratorError>;

    /// Add a goodwill credit to the customer account.
    async fn add_credit(
        &self,
        customer_id: &str,
        amount: f64,
        reason: &str,
    ) -> Result<ExecutionResult, CollaboratorError>;
}

/// HTTP client for a bearer-token CRM API.
pub struct HttpCrm {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl HttpCrm {
    pub fn new(
        base_url: &str,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secrets,
            api_key: CachedSecret::new(CRM_API_KEY),
        })
    }
}

/// Map the CRM wire payload onto the pipeline's profile snapshot.
fn profile_from_payload(customer_id: &str, data: &Value) -> CustomerProfile {
    CustomerProfile {
        customer_id: data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(customer_id)
            .to_string(),
        name: data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        email: data.get("email").and_then(Value::as_str).map(String::from),
        phone: data.get("phone").and_then(Value::as_str).map(String::from),
        ltv: data
            .get("lifetime_value")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        status: data
            .get("tier")
            .and_then(Value::as_str)
            .unwrap_or("Standard")
            .to_string(),
        recent_order_count: data
            .get("orders_last_90_days")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        total_orders: data.get("total_orders").and_then(Value::as_u64).unwrap_or(0) as u32,
        avg_order_value: data
            .get("avg_order_value")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        support_tickets: data
            .get("support_tickets_count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        satisfaction_score: data.get("satisfaction_score").and_then(Value::as_f64),
        join_date: data
            .get("created_at")
            .and_then(Value::as_str)
            .map(String::from),
        last_order_date: data
            .get("last_order_date")
            .and_then(Value::as_str)
            .map(String::from),
    }
}

#[async_trait]
impl CustomerRecords for HttpCrm {
    async fn lookup(&self, customer_id: &str) -> Result<Option<CustomerProfile>, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/customers/{customer_id}", self.base_url);

        info!(customer_id, "Looking up customer in CRM");
        let resp = self.client.get(&url).bearer_auth(api_key).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "CRM returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        Ok(Some(profile_from_payload(customer_id, &data)))
    }

    async fn append_note(&self, customer_id: &str, note: &str) -> Result<bool, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/customers/{customer_id}/notes", self.base_url);
        let payload = json!({
            "note": note,
            "created_by": "cx-rescue-pipeline",
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        Ok(resp.status().is_success())
    }

    async fn add_credit(
        &self,
        customer_id: &str,
        amount: f64,
        reason: &str,
    ) -> Result<ExecutionResult, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/customers/{customer_id}/credits", self.base_url);
        let payload = json!({
            "amount": amount,
            "reason": reason,
            "source": "cx-rescue-pipeline",
        });

        info!(customer_id, amount, "Adding account credit");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "credit endpoint returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        let mut details = Map::new();
        details.insert("customer_id".into(), Value::String(customer_id.into()));
        details.insert("amount".into(), json!(amount));
        if let Some(credit_id) = data.get("id").and_then(Value::as_str) {
            details.insert("credit_id".into(), Value::String(credit_id.into()));
        }
        Ok(ExecutionResult::ok(details))
    }
}
