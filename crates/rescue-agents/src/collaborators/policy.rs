//! Policy-search collaborator: ranked text snippets for a query.
//!
//! The pipeline treats this strictly as an external interface. The
//! built-in [`StaticPolicyIndex`] serves a fixed ranked document set so
//! the pipeline is runnable without a real vector index; swap in a real
//! search backend by implementing [`PolicyIndex`].

use async_trait::async_trait;
use tracing::info;

use crate::error::CollaboratorError;

/// One ranked policy document.
#[derive(Debug, Clone)]
pub struct PolicySnippet {
    pub id: String,
    pub content: String,
    pub score: f64,
}

/// Policy search contract: `search(query, top_k)` → ranked snippets.
#[async_trait]
pub trait PolicyIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<PolicySnippet>, CollaboratorError>;
}

/// Fixed in-memory snippet set, ranked by relevance score.
pub struct StaticPolicyIndex {
    documents: Vec<PolicySnippet>,
}

impl Default for StaticPolicyIndex {
    fn default() -> Self {
        Self {
            documents: vec![
                PolicySnippet {
                    id: "refund_policy_gold".into(),
                    content: "Refund Policy for Gold Tier Customers:\n\
                        Gold tier customers are eligible for full refunds within 90 days of purchase.\n\
                        No restocking fees apply. Expedited processing within 24 hours.\n\
                        For damaged items, immediate replacement or full refund at customer's choice."
                        .into(),
                    score: 0.95,
                },
                PolicySnippet {
                    id: "shipping_compensation".into(),
                    content: "Shipping Issue Compensation Guidelines:\n\
                        For late deliveries: Offer full shipping refund plus 10% order discount.\n\
                        For lost packages: Full replacement order with expedited shipping at no charge.\n\
                        For damaged shipments: Full refund or replacement plus shipping compensation."
                        .into(),
                    score: 0.88,
                },
                PolicySnippet {
                    id: "appeasement_matrix".into(),
                    content: "Customer Appeasement Matrix:\n\
                        High-value customers (LTV > $500): Up to $100 credit without approval.\n\
                        Order issues: 20-50% discount on next purchase.\n\
                        Service failures: Expedited shipping upgrade + account credit."
                        .into(),
                    score: 0.82,
                },
                PolicySnippet {
                    id: "escalation_guidelines".into(),
                    content: "Escalation Guidelines:\n\
                        Immediate escalation required for threats to leave or legal action.\n\
                        Gold/VIP customers: Direct manager contact within 2 hours.\n\
                        Compensation authority: Front-line agents up to $50, managers up to $200."
                        .into(),
                    score: 0.78,
                },
            ],
        }
    }
}

#[async_trait]
impl PolicyIndex for StaticPolicyIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<PolicySnippet>, CollaboratorError> {
        info!(query, "Searching policies");
        let mut results = self.documents.clone();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }
}

/// Render ranked snippets as the free-text context block consumed by
/// solution generation.
pub fn format_snippets(snippets: &[PolicySnippet]) -> String {
    let mut out = String::from("RELEVANT COMPANY POLICIES:\n\n");
    for (i, snippet) in snippets.iter().enumerate() {
        out.push_str(&format!(
            "Policy {} ({}) - Relevance: {:.2}\n{}\n\n",
            i + 1,
            snippet.id,
            snippet.score,
            snippet.content
        ));
        out.push_str(&"-".repeat(50));
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_index_ranks_and_truncates() {
        let index = StaticPolicyIndex::default();
        let results = index.search("refund policy", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "refund_policy_gold");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_static_index_top_k_larger_than_corpus() {
        let index = StaticPolicyIndex::default();
        let results = index.search("anything", 50).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_format_snippets_layout() {
        let snippets = vec![PolicySnippet {
            id: "refund_policy_gold".into(),
            content: "Full refunds within 90 days.".into(),
            score: 0.95,
        }];
        let text = format_snippets(&snippets);
        assert!(text.starts_with("RELEVANT COMPANY POLICIES:"));
        assert!(text.contains("Policy 1 (refund_policy_gold) - Relevance: 0.95"));
        assert!(text.contains("Full refunds within 90 days."));
    }
}
