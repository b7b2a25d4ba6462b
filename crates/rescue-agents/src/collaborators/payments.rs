//! Payment collaborator: refunds and coupons.
//!
//! The refund API is cent-denominated; amounts cross the boundary as
//! integer cents and come back as dollars.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{CachedSecret, SecretStore, PAYMENT_API_KEY};
use crate::contracts::ExecutionResult;
use crate::error::CollaboratorError;

/// Payment gateway contract.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refund an order; `amount = None` means a full refund.
    async fn refund(
        &self,
        order_id: &str,
        amount: Option<f64>,
        reason: &str,
    ) -> Result<ExecutionResult, CollaboratorError>;

    /// Create a discount coupon for the customer.
    async fn create_coupon(
        &self,
        customer_id: &str,
        value: f64,
        unit: &str,
    ) -> Result<ExecutionResult, CollaboratorError>;
}

pub(crate) fn dollars_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub(crate) fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// HTTP payment client (Stripe-style refunds endpoint).
pub struct HttpPayments {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl HttpPayments {
    pub fn new(
        base_url: &str,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secrets,
            api_key: CachedSecret::new(PAYMENT_API_KEY),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPayments {
    async fn refund(
        &self,
        order_id: &str,
        amount: Option<f64>,
        reason: &str,
    ) -> Result<ExecutionResult, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/v1/refunds", self.base_url);

        let mut payload = json!({
            "charge": order_id,
            "reason": reason,
            "metadata": {"source": "cx-rescue-pipeline", "automated": "true"},
        });
        if let Some(amount) = amount {
            payload["amount"] = json!(dollars_to_cents(amount));
        }

        info!(order_id, ?amount, "Processing refund");
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
                "refund endpoint returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        let mut details = Map::new();
        details.insert("order_id".into(), Value::String(order_id.into()));
        if let Some(refund_id) = data.get("id").and_then(Value::as_str) {
            details.insert("refund_id".into(), Value::String(refund_id.into()));
        }
        if let Some(cents) = data.get("amount").and_then(Value::as_i64) {
            details.insert("amount".into(), json!(cents_to_dollars(cents)));
        }
        if let Some(state) = data.get("status").and_then(Value::as_str) {
            details.insert("status".into(), Value::String(state.into()));
        }
        Ok(ExecutionResult::ok(details))
    }

    async fn create_coupon(
        &self,
        customer_id: &str,
        value: f64,
        unit: &str,
    ) -> Result<ExecutionResult, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/v1/coupons", self.base_url);
        let payload = json!({
            "customer": customer_id,
            "value": value,
            "unit": unit,
            "metadata": {"source": "cx-rescue-pipeline"},
        });

        info!(customer_id, value, unit, "Creating coupon");
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
                "coupon endpoint returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        let mut details = Map::new();
        details.insert("customer_id".into(), Value::String(customer_id.into()));
        details.insert("value".into(), json!(value));
        details.insert("unit".into(), Value::String(unit.into()));
        if let Some(coupon_id) = data.get("id").and_then(Value::as_str) {
            details.insert("coupon_id".into(), Value::String(coupon_id.into()));
        }
        Ok(ExecutionResult::ok(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollars_to_cents_rounds() {
        assert_eq!(dollars_to_cents(75.50), 7550);
        assert_eq!(dollars_to_cents(0.1 + 0.2), 30);
    }

    #[test]
    fn test_cents_to_dollars() {
        assert_eq!(cents_to_dollars(7550), 75.50);
    }
}
