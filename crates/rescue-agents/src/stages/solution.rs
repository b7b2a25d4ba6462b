//! Solution stage: classify the problem, gather context, rank remedies.
//!
//! Four sub-steps, each independently fault-tolerant: classification
//! falls back to the most conservative category, failed policy
//! retrieval yields an explicit marker, operational lookups are
//! individually isolated, and total generation failure produces a
//! single human-escalation solution.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::collaborators::inventory::Inventory;
use crate::collaborators::orders::OrderSystem;
use crate::collaborators::policy::{format_snippets, PolicyIndex};
use crate::contracts::{
    CaseFile, CustomerProfile, OperationalData, ProblemAnalysis, Solution, SolutionSet,
};
use crate::decision::DecisionSupport;
use crate::prompts;
use crate::stages::Solve;

/// Transcript excerpt length for the classification prompt.
const TRANSCRIPT_EXCERPT_CHARS: usize = 2000;

/// Snippets requested per policy query.
const POLICY_TOP_K: usize = 5;

/// Marker used when retrieval yields nothing, so the generation prompt
/// never silently omits the policy section.
const NO_POLICY_CONTEXT: &str = "No policy context available.";

/// Wire shape of the model's solution list.
#[derive(Debug, Deserialize)]
struct SolutionsEnvelope {
    #[serde(default)]
    ranked_solutions: Vec<Value>,
}

pub struct SolutionStage {
    decision: DecisionSupport,
    policies: Arc<dyn PolicyIndex>,
    orders: Arc<dyn OrderSystem>,
    inventory: Arc<dyn Inventory>,
}

impl SolutionStage {
    pub fn new(
        decision: DecisionSupport,
        policies: Arc<dyn PolicyIndex>,
        orders: Arc<dyn OrderSystem>,
        inventory: Arc<dyn Inventory>,
    ) -> Self {
        Self {
            decision,
            policies,
            orders,
            inventory,
        }
    }

    async fn classify(&self, case_file: &CaseFile) -> ProblemAnalysis {
        let prompt = prompts::classification_prompt(
            &case_file.issue_summary,
            prompts::excerpt(&case_file.transcript_text, TRANSCRIPT_EXCERPT_CHARS),
        );
        let analysis = self
            .decision
            .decide_or("problem_classification", &prompt, |_| Ok(()), ProblemAnalysis::fallback)
            .await;
        info!(category = %analysis.primary_category, "Problem analysis completed");
        analysis
    }

    async fn gather_policy_context(
        &self,
        analysis: &ProblemAnalysis,
        customer: &CustomerProfile,
    ) -> String {
        let category = analysis.primary_category.query_fragment();
        let tier = &customer.status;
        let queries = [
            format!("{category} policy for {tier} tier customer"),
            format!("refund policy {tier} customer"),
            format!("appeasement guidelines {category}"),
            "escalation procedures high value customer".to_string(),
        ];

        let mut sections = Vec::new();
        for query in &queries {
            match self.policies.search(query, POLICY_TOP_K).await {
                Ok(snippets) if !snippets.is_empty() => sections.push(format_snippets(&snippets)),
                Ok(_) => {}
                Err(e) => warn!(query = %query, error = %e, "Policy search failed"),
            }
        }

        if sections.is_empty() {
            NO_POLICY_CONTEXT.to_string()
        } else {
            sections.join("\n\n")
        }
    }

    async fn gather_operational_data(&self, analysis: &ProblemAnalysis) -> OperationalData {
        let mut data = OperationalData::default();

        if let Some(order_id) = analysis.order_id.as_deref().filter(|id| !id.is_empty()) {
            match self.orders.get_status(order_id).await {
                Ok(Some(order)) => data.order_status = Some(order),
                Ok(None) => warn!(order_id, "Order not found"),
                Err(e) => warn!(order_id, error = %e, "Order lookup failed"),
            }
        }

        // Each product lookup is independent; a failure is a missing key,
        // never an aborted gather.
        for product in &analysis.products {
            match self.inventory.check_availability(product).await {
                Ok(Some(stock)) => {
                    let value = serde_json::to_value(&stock).unwrap_or(Value::Null);
                    data.inventory.insert(product.clone(), value);
                }
                Ok(None) => warn!(product = %product, "Product not found in inventory"),
                Err(e) => warn!(product = %product, error = %e, "Inventory lookup failed"),
            }
        }

        data
    }

    async fn generate_solutions(
        &self,
        case_file: &CaseFile,
        analysis: &ProblemAnalysis,
        policy_context: &str,
        operational_data: &OperationalData,
    ) -> Vec<Solution> {
        let prompt =
            prompts::solution_prompt(case_file, analysis, policy_context, operational_data);
        match self
            .decision
            .decide::<SolutionsEnvelope, _>(&prompt, |_| Ok(()))
            .await
        {
            Ok(envelope) => {
                let solutions: Vec<Solution> = envelope
                    .ranked_solutions
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let (solution, missing) = Solution::from_value(value);
                        if !missing.is_empty() {
                            // Kept anyway: execution fails fast on missing
                            // params instead of dropping candidates here.
                            warn!(
                                solution = i + 1,
                                missing = ?missing,
                                "Solution missing required fields"
                            );
                        }
                        solution
                    })
                    .collect();
                info!(count = solutions.len(), "Generated solutions");
                solutions
            }
            Err(e) => {
                warn!(error = %e, "Solution generation failed — escalating to human");
                vec![Solution::escalation_fallback()]
            }
        }
    }
}

#[async_trait]
impl Solve for SolutionStage {
    async fn process(&self, case_file: &CaseFile) -> SolutionSet {
        info!("Solution stage processing case file");

        let problem_analysis = self.classify(case_file).await;
        let policy_context = self
            .gather_policy_context(&problem_analysis, &case_file.customer_details)
            .await;
        let operational_data = self.gather_operational_data(&problem_analysis).await;
        let ranked_solutions = self
            .generate_solutions(
                case_file,
                &problem_analysis,
                &policy_context,
                &operational_data,
            )
            .await;

        SolutionSet {
            ranked_solutions,
            problem_analysis,
            policy_context,
            operational_data,
        }
    }
}
