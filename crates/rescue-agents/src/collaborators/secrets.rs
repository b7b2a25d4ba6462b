//! Credential access with exactly-once-per-process caching.
//!
//! Each collaborator client owns a [`CachedSecret`] — a memoized
//! accessor filled from the [`SecretStore`] on first use and reused for
//! the process lifetime, never refreshed mid-run. There is no global
//! registry; each client instance owns its own cache.

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::CollaboratorError;

/// Well-known secret names.
pub const CRM_API_KEY: &str = "crm-api-key";
pub const TRANSCRIPT_API_KEY: &str = "transcript-api-key";
pub const INVENTORY_API_KEY: &str = "inventory-api-key";
pub const PAYMENT_API_KEY: &str = "payment-api-key";
pub const SENDGRID_API_KEY: &str = "sendgrid-api-key";
pub const TWILIO_ACCOUNT_SID: &str = "twilio-account-sid";
pub const TWILIO_AUTH_TOKEN: &str = "twilio-auth-token";
pub const LLM_API_KEY: &str = "llm-api-key";

/// Source of collaborator credentials.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, CollaboratorError>;
}

/// Reads secrets from the environment: `crm-api-key` → `CRM_API_KEY`.
pub struct EnvSecretStore;

fn env_var_name(secret: &str) -> String {
    secret.to_uppercase().replace('-', "_")
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, name: &str) -> Result<String, CollaboratorError> {
        std::env::var(env_var_name(name))
            .map_err(|_| CollaboratorError::Credential(format!("secret {name} not set")))
    }
}

/// One lazily-fetched, process-lifetime credential.
pub struct CachedSecret {
    name: &'static str,
    cell: OnceCell<String>,
}

impl CachedSecret {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
        }
    }

    /// Fetch on first use, reuse thereafter.
    pub async fn get(&self, store: &dyn SecretStore) -> Result<&str, CollaboratorError> {
        self.cell
            .get_or_try_init(|| store.fetch(self.name))
            .await
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingStore(AtomicU32);

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn fetch(&self, name: &str) -> Result<String, CollaboratorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("secret-for-{name}"))
        }
    }

    #[test]
    fn test_env_var_name_mapping() {
        assert_eq!(env_var_name("crm-api-key"), "CRM_API_KEY");
        assert_eq!(env_var_name("twilio-auth-token"), "TWILIO_AUTH_TOKEN");
    }

    #[tokio::test]
    async fn test_cached_secret_fetches_once() {
        let store = CountingStore(AtomicU32::new(0));
        let secret = CachedSecret::new(CRM_API_KEY);

        let first = secret.get(&store).await.unwrap().to_string();
        let second = secret.get(&store).await.unwrap().to_string();

        assert_eq!(first, "secret-for-crm-api-key");
        assert_eq!(first, second);
        assert_eq!(store.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_env_store_missing_secret_is_credential_error() {
        let store = EnvSecretStore;
        let err = store.fetch("definitely-not-set-secret-name").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Credential(_)));
    }
}
