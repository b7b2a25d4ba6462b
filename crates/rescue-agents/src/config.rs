//! Pipeline configuration with environment-variable defaults.
//!
//! Everything here is read once at startup. Escalation thresholds are
//! business constants with documented defaults, overridable through the
//! environment rather than a rule engine.

use std::time::Duration;

/// Generative model endpoint (OpenAI-compatible chat completions).
#[derive(Debug, Clone)]
pub struct LlmEndpoint {
    pub url: String,
    pub model: String,
}

/// When a customer counts as high-value for escalation purposes.
///
/// A customer qualifies when lifetime value exceeds `ltv_threshold` OR
/// their tier is one of `priority_tiers`.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub ltv_threshold: f64,
    pub priority_tiers: Vec<String>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            ltv_threshold: 500.0,
            priority_tiers: vec!["Gold".into(), "VIP".into(), "Premium".into()],
        }
    }
}

impl EscalationPolicy {
    /// Render the tier list for prompt embedding, e.g. `Gold/VIP/Premium`.
    pub fn tiers_label(&self) -> String {
        self.priority_tiers.join("/")
    }
}

/// Top-level configuration for one pipeline process.
#[derive(Debug, Clone)]
pub struct RescueConfig {
    pub llm: LlmEndpoint,
    pub crm_base_url: String,
    pub order_base_url: String,
    pub inventory_base_url: String,
    pub payment_base_url: String,
    pub transcript_base_url: String,
    /// Sender address for outbound customer email.
    pub from_email: String,
    /// Sender number for outbound SMS (E.164).
    pub sms_from_number: String,
    pub escalation: EscalationPolicy,
    /// Bounded timeout applied to every external call.
    pub request_timeout: Duration,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            llm: LlmEndpoint {
                url: env_or("RESCUE_LLM_URL", "http://localhost:8080/v1"),
                model: env_or("RESCUE_LLM_MODEL", "gemini-1.5-pro"),
            },
            crm_base_url: env_or("RESCUE_CRM_URL", "https://api.yourcrm.com"),
            order_base_url: env_or("RESCUE_ORDER_URL", "https://api.yourinventory.com"),
            inventory_base_url: env_or("RESCUE_INVENTORY_URL", "https://api.yourinventory.com"),
            payment_base_url: env_or("RESCUE_PAYMENT_URL", "https://api.stripe.com"),
            transcript_base_url: env_or("RESCUE_TRANSCRIPT_URL", "https://api.yourtranscripts.com"),
            from_email: env_or("RESCUE_FROM_EMAIL", "support@yourcompany.com"),
            sms_from_number: env_or("RESCUE_SMS_FROM", "+1234567890"),
            escalation: EscalationPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_policy_defaults() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.ltv_threshold, 500.0);
        assert_eq!(policy.tiers_label(), "Gold/VIP/Premium");
    }

    #[test]
    fn test_config_timeout_default() {
        let config = RescueConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
