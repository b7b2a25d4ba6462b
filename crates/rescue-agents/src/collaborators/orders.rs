//! Order-management collaborator: order status, replacement orders, and
//! shipping upgrades.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{CachedSecret, SecretStore, INVENTORY_API_KEY};
use crate::contracts::{ExecutionResult, Order};
use crate::error::CollaboratorError;

/// Order system contract.
#[async_trait]
pub trait OrderSystem: Send + Sync {
    /// `Ok(None)` means the order does not exist.
    async fn get_status(&self, order_id: &str) -> Result<Option<Order>, CollaboratorError>;

    /// Create a replacement for an existing order, optionally forcing a
    /// shipping upgrade.
    async fn create_replacement(
        &self,
        order_id: &str,
        shipping_upgrade: bool,
    ) -> Result<ExecutionResult, CollaboratorError>;

    /// Upgrade the shipping method on a pending order.
    async fn upgrade_shipping(
        &self,
        order_id: &str,
        new_method: &str,
    ) -> Result<ExecutionResult, CollaboratorError>;
}

/// HTTP client for the order-management API.
pub struct HttpOrderSystem {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl HttpOrderSystem {
    pub fn new(
        base_url: &str,
        secrets: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secrets,
            api_key: CachedSecret::new(INVENTORY_API_KEY),
        })
    }

    async fn fetch_order_raw(
        &self,
        order_id: &str,
        api_key: &str,
    ) -> Result<Option<Value>, CollaboratorError> {
        let url = format!("{}/orders/{order_id}", self.base_url);
        let resp = self.client.get(&url).bearer_auth(api_key).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "order system returned {status}"
            )));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        Ok(Some(data))
    }
}

fn order_from_payload(order_id: &str, data: &Value) -> Order {
    Order {
        order_id: data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(order_id)
            .to_string(),
        status: data
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        order_date: data
            .get("created_at")
            .and_then(Value::as_str)
            .map(String::from),
        total_amount: data.get("total").and_then(Value::as_f64).unwrap_or(0.0),
        items: data
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        shipping_address: data.get("shipping_address").cloned().filter(|v| !v.is_null()),
        tracking_number: data
            .get("tracking_number")
            .and_then(Value::as_str)
            .map(String::from),
        estimated_delivery: data
            .get("estimated_delivery")
            .and_then(Value::as_str)
            .map(String::from),
        shipping_method: data
            .get("shipping_method")
            .and_then(Value::as_str)
            .map(String::from),
        payment_status: data
            .get("payment_status")
            .and_then(Value::as_str)
            .map(String::from),
    }
}

#[async_trait]
impl OrderSystem for HttpOrderSystem {
    async fn get_status(&self, order_id: &str) -> Result<Option<Order>, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        info!(order_id, "Looking up order");
        let raw = self.fetch_order_raw(order_id, api_key).await?;
        Ok(raw.map(|data| order_from_payload(order_id, &data)))
    }

    async fn create_replacement(
        &self,
        order_id: &str,
        shipping_upgrade: bool,
    ) -> Result<ExecutionResult, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?.to_string();

        let Some(original) = self.fetch_order_raw(order_id, &api_key).await? else {
            return Ok(ExecutionResult::failure("Original order not found"));
        };

        let shipping_method = if shipping_upgrade {
            "express".to_string()
        } else {
            original
                .get("shipping_method")
                .and_then(Value::as_str)
                .unwrap_or("standard")
                .to_string()
        };

        let url = format!("{}/orders", self.base_url);
        let payload = json!({
            "customer_id": original.get("customer_id"),
            "items": original.get("items").cloned().unwrap_or_else(|| json!([])),
            "shipping_address": original.get("shipping_address"),
            "shipping_method": shipping_method,
            "order_type": "replacement",
            "original_order_id": order_id,
            "priority": "high",
        });

        info!(order_id, shipping_method, "Creating replacement order");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "replacement endpoint returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        let mut details = Map::new();
        details.insert("original_order_id".into(), Value::String(order_id.into()));
        details.insert("shipping_method".into(), Value::String(shipping_method));
        if let Some(new_id) = data.get("id").and_then(Value::as_str) {
            details.insert("new_order_id".into(), Value::String(new_id.into()));
        }
        if let Some(tracking) = data.get("tracking_number").and_then(Value::as_str) {
            details.insert("tracking_number".into(), Value::String(tracking.into()));
        }
        Ok(ExecutionResult::ok(details))
    }

    async fn upgrade_shipping(
        &self,
        order_id: &str,
        new_method: &str,
    ) -> Result<ExecutionResult, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?;
        let url = format!("{}/orders/{order_id}/shipping", self.base_url);
        let payload = json!({
            "shipping_method": new_method,
            "waive_upgrade_fee": true,
            "priority": "high",
        });

        info!(order_id, new_method, "Upgrading shipping");
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "shipping endpoint returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        let mut details = Map::new();
        details.insert("order_id".into(), Value::String(order_id.into()));
        details.insert(
            "new_shipping_method".into(),
            Value::String(new_method.into()),
        );
        if let Some(eta) = data.get("estimated_delivery").and_then(Value::as_str) {
            details.insert("new_estimated_delivery".into(), Value::String(eta.into()));
        }
        Ok(ExecutionResult::ok(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_full_payload() {
        let payload = json!({
            "id": "O-1",
            "status": "delivered",
            "total": 75.5,
            "items": [{"sku": "SKU-1"}],
            "tracking_number": "TRK-9",
            "shipping_method": "standard"
        });
        let order = order_from_payload("O-1", &payload);
        assert_eq!(order.order_id, "O-1");
        assert_eq!(order.status, "delivered");
        assert_eq!(order.total_amount, 75.5);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.tracking_number.as_deref(), Some("TRK-9"));
    }

    #[test]
    fn test_order_from_sparse_payload() {
        let order = order_from_payload("O-2", &json!({}));
        assert_eq!(order.order_id, "O-2");
        assert_eq!(order.status, "unknown");
        assert!(order.items.is_empty());
    }
}
