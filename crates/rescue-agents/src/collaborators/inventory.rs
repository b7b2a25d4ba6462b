//! Inventory collaborator: product availability lookups.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::collaborators::http_client;
use crate::collaborators::secrets::{CachedSecret, SecretStore, INVENTORY_API_KEY};
use crate::contracts::StockInfo;
use crate::error::CollaboratorError;

/// Inventory contract. `Ok(None)` means the product is unknown.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn check_availability(
        &self,
        product: &str,
    ) -> Result<Option<StockInfo>, CollaboratorError>;
}

/// HTTP inventory client: product search followed by a stock-level
/// lookup, combined into one snapshot.
pub struct HttpInventory {
    client: reqwest::Client,
    base_url: String,
    secrets: Arc<dyn SecretStore>,
    api_key: CachedSecret,
}

impl HttpInventory {
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

    async fn find_product(
        &self,
        product: &str,
        api_key: &str,
    ) -> Result<Option<Value>, CollaboratorError> {
        let url = format!("{}/products/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .query(&[("q", product)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "product search returned {status}"
            )));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))?;
        Ok(data
            .get("products")
            .and_then(Value::as_array)
            .and_then(|products| products.first())
            .cloned())
    }

    async fn stock_levels(
        &self,
        product_id: &str,
        api_key: &str,
    ) -> Result<Value, CollaboratorError> {
        let url = format!("{}/inventory/{product_id}", self.base_url);
        let resp = self.client.get(&url).bearer_auth(api_key).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "inventory endpoint returned {status}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| CollaboratorError::Payload(e.to_string()))
    }
}

#[async_trait]
impl Inventory for HttpInventory {
    async fn check_availability(
        &self,
        product: &str,
    ) -> Result<Option<StockInfo>, CollaboratorError> {
        let api_key = self.api_key.get(self.secrets.as_ref()).await?.to_string();

        info!(product, "Checking inventory");
        let Some(product_info) = self.find_product(product, &api_key).await? else {
            return Ok(None);
        };

        let product_id = product_info
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let stock = self.stock_levels(&product_id, &api_key).await?;
        let quantity = stock.get("quantity").and_then(Value::as_i64).unwrap_or(0);

        Ok(Some(StockInfo {
            product_id,
            product_name: product_info
                .get("name")
                .and_then(Value::as_str)
                .map(String::from),
            sku: product_info
                .get("sku")
                .and_then(Value::as_str)
                .map(String::from),
            in_stock: quantity > 0,
            quantity_available: quantity,
            restock_date: stock
                .get("expected_restock")
                .and_then(Value::as_str)
                .map(String::from),
            alternative_products: stock
                .get("alternative_products")
                .and_then(Value::as_array)
                .map(|alts| {
                    alts.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }))
    }
}
