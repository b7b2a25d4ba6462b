//! Decision-Support Client: structured decisions from a generative model.
//!
//! The parse-validate-fallback pattern recurs in every stage, so it is
//! implemented once here, parametrized by an expected shape and a
//! validator. Callers get exactly one of:
//! - a fully validated `T`, or
//! - a [`DecisionError`] they map to their own deterministic fallback.
//!
//! Partially-validated structured data is never returned. The client is
//! stateless across calls; each invocation is independent.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::collaborators::llm::TextGenerator;
use crate::error::DecisionError;

/// Strip a leading/trailing code fence (```json … ```), if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(fence) {
            let rest = rest.trim_start();
            let rest = rest.strip_suffix("```").unwrap_or(rest);
            return rest.trim();
        }
    }
    trimmed
}

/// Locate a JSON object in a response that may carry surrounding prose:
/// first `{` to last `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Fence-strip and parse raw model text into the expected shape.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, DecisionError> {
    let cleaned = strip_code_fence(raw);
    let candidate = if cleaned.starts_with('{') {
        cleaned
    } else {
        extract_json_object(cleaned).unwrap_or(cleaned)
    };
    serde_json::from_str(candidate).map_err(|e| DecisionError::Malformed(e.to_string()))
}

/// Wraps the text-generation collaborator behind the structured-decision
/// contract the stages rely on.
#[derive(Clone)]
pub struct DecisionSupport {
    generator: Arc<dyn TextGenerator>,
}

impl DecisionSupport {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Request a structured decision and validate it.
    ///
    /// Transport failure ⇒ `Transport`; unparseable text ⇒ `Malformed`;
    /// validator rejection ⇒ `Invalid`.
    pub async fn decide<T, V>(&self, prompt: &str, validate: V) -> Result<T, DecisionError>
    where
        T: DeserializeOwned,
        V: Fn(&T) -> Result<(), String>,
    {
        let raw = self
            .generator
            .generate(prompt)
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;
        let parsed: T = parse_structured(&raw)?;
        validate(&parsed).map_err(DecisionError::Invalid)?;
        Ok(parsed)
    }

    /// Like [`decide`](Self::decide) but substitutes the caller's
    /// deterministic fallback on any failure, logging the reason.
    pub async fn decide_or<T, V, F>(
        &self,
        context: &'static str,
        prompt: &str,
        validate: V,
        fallback: F,
    ) -> T
    where
        T: DeserializeOwned,
        V: Fn(&T) -> Result<(), String>,
        F: FnOnce() -> T,
    {
        match self.decide(prompt, validate).await {
            Ok(value) => value,
            Err(e) => {
                warn!(context, error = %e, "Decision failed — using fallback");
                fallback()
            }
        }
    }

    /// Request free text (no structure expected), trimmed.
    pub async fn compose(&self, prompt: &str) -> Result<String, DecisionError> {
        let raw = self
            .generator
            .generate(prompt)
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;
        Ok(raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Verdict {
        escalate: bool,
    }

    struct Scripted(&'static str);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl TextGenerator for Unreachable {
        async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Transport("connection refused".into()))
        }
    }

    // -- fence stripping --

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n{\"escalate\": true}\n```";
        assert_eq!(strip_code_fence(raw), "{\"escalate\": true}");
    }

    #[test]
    fn test_strip_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_noop_without_fence() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_fence_without_closing() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    // -- parsing --

    #[test]
    fn test_parse_structured_fenced() {
        let verdict: Verdict = parse_structured("```json\n{\"escalate\": false}\n```").unwrap();
        assert!(!verdict.escalate);
    }

    #[test]
    fn test_parse_structured_with_surrounding_prose() {
        let verdict: Verdict =
            parse_structured("Here is my decision: {\"escalate\": true} — done.").unwrap();
        assert!(verdict.escalate);
    }

    #[test]
    fn test_parse_structured_garbage_is_malformed() {
        let err = parse_structured::<Verdict>("not json at all").unwrap_err();
        assert!(matches!(err, DecisionError::Malformed(_)));
    }

    // -- decide --

    #[tokio::test]
    async fn test_decide_valid() {
        let support = DecisionSupport::new(Arc::new(Scripted("{\"escalate\": true}")));
        let verdict: Verdict = support.decide("prompt", |_| Ok(())).await.unwrap();
        assert!(verdict.escalate);
    }

    #[tokio::test]
    async fn test_decide_validator_rejection_is_invalid() {
        let support = DecisionSupport::new(Arc::new(Scripted("{\"escalate\": true}")));
        let err = support
            .decide::<Verdict, _>("prompt", |_| Err("missing case file".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DecisionError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_decide_transport_failure() {
        let support = DecisionSupport::new(Arc::new(Unreachable));
        let err = support
            .decide::<Verdict, _>("prompt", |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, DecisionError::Transport(_)));
        assert!(err.to_string().starts_with("LLM error:"));
    }

    #[tokio::test]
    async fn test_decide_or_substitutes_fallback() {
        let support = DecisionSupport::new(Arc::new(Scripted("garbage")));
        let verdict: Verdict = support
            .decide_or("test", "prompt", |_| Ok(()), || Verdict { escalate: false })
            .await;
        assert!(!verdict.escalate);
    }

    #[tokio::test]
    async fn test_compose_trims() {
        let support = DecisionSupport::new(Arc::new(Scripted("  Dear customer...  \n")));
        assert_eq!(support.compose("p").await.unwrap(), "Dear customer...");
    }
}
