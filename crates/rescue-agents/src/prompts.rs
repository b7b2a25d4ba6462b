//! Prompt templates for each pipeline decision.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever template content
//! changes, so a given decision can be traced back to the prompt text
//! that produced it.

use crate::config::EscalationPolicy;
use crate::contracts::{CaseFile, CustomerProfile, ExecutionResult, OperationalData, ProblemAnalysis, Solution};

/// Prompt version. Bump on any template content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Take at most `max_chars` characters from the front of a transcript,
/// never splitting a multi-byte character.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Triage decision prompt: full profile, sentiment score, transcript,
/// and the explicit escalation criteria.
pub fn triage_prompt(
    profile: &CustomerProfile,
    sentiment_score: f64,
    transcript: &str,
    policy: &EscalationPolicy,
) -> String {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_default();
    format!(
        "You are a Triage Agent for critical customer complaints.\n\
         Your goal is to assess the situation's severity and escalate if necessary.\n\
         \n\
         Customer Details:\n{profile_json}\n\
         \n\
         Sentiment Score: {sentiment_score} (0=neutral, 1=extremely negative)\n\
         \n\
         Transcript:\n{transcript}\n\
         \n\
         Instructions:\n\
         1. Analyze the customer's value (LTV > ${ltv} OR status is {tiers} tier)\n\
         2. Analyze the transcript for explicit phrases of severe dissatisfaction:\n\
         \x20  - \"never again\", \"worst experience\", \"reporting you\"\n\
         \x20  - Threats to leave or switch competitors\n\
         \x20  - Demands for refunds or escalation to management\n\
         \x20  - Language indicating extreme frustration or anger\n\
         3. Consider the high sentiment score ({sentiment_score}) as additional evidence\n\
         \n\
         Decision Criteria:\n\
         - Escalate if: Customer is high-value AND transcript confirms severe dissatisfaction\n\
         - Do not escalate if: Customer is low-value OR transcript shows mild complaints only\n\
         \n\
         If escalating, create a case_file with:\n\
         - customer_details: The full customer information\n\
         - transcript_text: The full transcript\n\
         - issue_summary: One-sentence summary of the core problem\n\
         \n\
         Respond ONLY with valid JSON in this format:\n\
         {{\"escalate\": true, \"case_file\": {{\"customer_details\": ..., \"transcript_text\": \"...\", \"issue_summary\": \"...\"}}}}\n\
         \n\
         OR if not escalating:\n\
         {{\"escalate\": false, \"reason\": \"explanation\"}}",
        ltv = policy.ltv_threshold,
        tiers = policy.tiers_label(),
    )
}

/// Problem-classification prompt for the Solution stage.
pub fn classification_prompt(issue_summary: &str, transcript_excerpt: &str) -> String {
    format!(
        "Analyze this customer issue to determine the problem category and key details.\n\
         \n\
         Issue Summary: {issue_summary}\n\
         \n\
         Transcript: {transcript_excerpt}...\n\
         \n\
         Categorize this issue into one or more of these types:\n\
         - ORDER_ISSUE: Problems with orders (delays, wrong items, damaged goods)\n\
         - BILLING_ISSUE: Payment, refund, or billing problems\n\
         - PRODUCT_ISSUE: Product defects or quality issues\n\
         - SERVICE_ISSUE: Poor service experience or support issues\n\
         - SHIPPING_ISSUE: Delivery problems or shipping concerns\n\
         - ACCOUNT_ISSUE: Account access or profile problems\n\
         \n\
         Also extract:\n\
         - Order ID (if mentioned)\n\
         - Product names/SKUs (if mentioned)\n\
         - Specific complaint details\n\
         - Customer emotions/urgency level\n\
         \n\
         Respond with JSON:\n\
         {{\n\
         \x20 \"primary_category\": \"ORDER_ISSUE\",\n\
         \x20 \"secondary_categories\": [\"SHIPPING_ISSUE\"],\n\
         \x20 \"order_id\": \"order id or null\",\n\
         \x20 \"products\": [\"product names\"],\n\
         \x20 \"complaint_details\": [\"specific issues\"],\n\
         \x20 \"urgency_level\": \"low|medium|high|critical\"\n\
         }}"
    )
}

/// Solution-generation prompt: the full case plus every piece of
/// gathered context.
pub fn solution_prompt(
    case_file: &CaseFile,
    analysis: &ProblemAnalysis,
    policy_context: &str,
    operational_data: &OperationalData,
) -> String {
    let case_json = serde_json::to_string_pretty(case_file).unwrap_or_default();
    let analysis_json = serde_json::to_string_pretty(analysis).unwrap_or_default();
    let operational_json = serde_json::to_string_pretty(operational_data).unwrap_or_default();
    format!(
        "You are a master Solution Agent. Generate ranked solutions for this customer case.\n\
         \n\
         CASE FILE:\n{case_json}\n\
         \n\
         PROBLEM ANALYSIS:\n{analysis_json}\n\
         \n\
         RELEVANT POLICIES:\n{policy_context}\n\
         \n\
         OPERATIONAL DATA:\n{operational_json}\n\
         \n\
         Instructions:\n\
         1. Analyze the customer's problem, value, and available policies\n\
         2. Generate 2-3 concrete, ranked solutions in order of preference\n\
         3. Each solution should specify exact actions and parameters\n\
         4. Consider customer tier, problem severity, and company policies\n\
         5. Prioritize solutions that restore customer confidence\n\
         \n\
         Available Actions:\n\
         - full_refund: Full refund for order\n\
         - partial_refund: Partial refund with amount\n\
         - reship_order: Resend order with shipping upgrade\n\
         - generate_coupon: Create discount coupon\n\
         - account_credit: Add credit to customer account\n\
         - expedite_shipping: Upgrade shipping on pending order\n\
         - escalate_to_manager: Human escalation\n\
         - custom_appeasement: Custom resolution\n\
         \n\
         Format your response as JSON:\n\
         {{\n\
         \x20 \"ranked_solutions\": [\n\
         \x20   {{\n\
         \x20     \"solution_id\": 1,\n\
         \x20     \"action\": \"action_name\",\n\
         \x20     \"params\": {{\"param1\": \"value1\"}},\n\
         \x20     \"explanation\": \"Why this is the best solution\",\n\
         \x20     \"estimated_cost\": \"dollar amount or 'low/medium/high'\",\n\
         \x20     \"customer_impact\": \"expected customer satisfaction outcome\"\n\
         \x20   }}\n\
         \x20 ]\n\
         }}"
    )
}

/// Customer-email generation prompt.
pub fn email_prompt(
    profile: &CustomerProfile,
    issue_summary: &str,
    solution: &Solution,
    execution_result: &ExecutionResult,
) -> String {
    let execution_json = serde_json::to_string_pretty(execution_result).unwrap_or_default();
    format!(
        "Generate a personalized, empathetic email to a customer whose issue has been resolved.\n\
         \n\
         Customer Details:\n\
         - Name: {name}\n\
         - Customer Tier: {tier}\n\
         - Issue: {issue_summary}\n\
         \n\
         Solution Executed:\n\
         - Action: {action}\n\
         - Details: {explanation}\n\
         \n\
         Execution Result:\n{execution_json}\n\
         \n\
         Email Requirements:\n\
         1. Acknowledge their frustration and apologize sincerely\n\
         2. Explain the specific action taken to resolve their issue\n\
         3. Mention any compensation or benefits provided\n\
         4. Reassure them of our commitment to their satisfaction\n\
         5. Provide contact information for follow-up\n\
         6. Use a warm, professional tone\n\
         \n\
         Keep the email concise but thorough. Include specific details about what was done.",
        name = profile.name,
        tier = profile.status,
        action = solution.action,
        explanation = solution.explanation,
    )
}

/// Fixed apology template used when email generation fails. No
/// personalization beyond the customer's name — communication is never
/// skipped solely because generation failed.
pub fn fallback_email(name: &str) -> String {
    format!(
        "Dear {name},\n\
         \n\
         We sincerely apologize for the recent issue you experienced. We have taken \
         immediate action to resolve your concern and ensure your satisfaction.\n\
         \n\
         We understand how frustrating this situation must have been, and we want to \
         make it right.\n\
         \n\
         If you have any questions or concerns, please don't hesitate to reach out to us.\n\
         \n\
         Thank you for your patience and for being a valued customer.\n\
         \n\
         Best regards,\n\
         Customer Experience Team"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationPolicy;

    fn profile() -> CustomerProfile {
        serde_json::from_value(serde_json::json!({
            "customer_id": "C1",
            "name": "Jane Doe",
            "ltv": 1500.0,
            "status": "Gold"
        }))
        .unwrap()
    }

    #[test]
    fn test_excerpt_short_text() {
        assert_eq!(excerpt("short", 2000), "short");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let text = "é".repeat(3000);
        let cut = excerpt(&text, 2000);
        assert_eq!(cut.chars().count(), 2000);
    }

    #[test]
    fn test_triage_prompt_embeds_policy() {
        let prompt = triage_prompt(&profile(), 0.95, "the transcript", &EscalationPolicy::default());
        assert!(prompt.contains("LTV > $500"));
        assert!(prompt.contains("Gold/VIP/Premium"));
        assert!(prompt.contains("worst experience"));
        assert!(prompt.contains("the transcript"));
        assert!(prompt.contains("Sentiment Score: 0.95"));
    }

    #[test]
    fn test_classification_prompt_lists_all_categories() {
        let prompt = classification_prompt("late order", "transcript text");
        for category in [
            "ORDER_ISSUE",
            "BILLING_ISSUE",
            "PRODUCT_ISSUE",
            "SERVICE_ISSUE",
            "SHIPPING_ISSUE",
            "ACCOUNT_ISSUE",
        ] {
            assert!(prompt.contains(category), "missing {category}");
        }
    }

    #[test]
    fn test_fallback_email_uses_name_only() {
        let body = fallback_email("Jane Doe");
        assert!(body.starts_with("Dear Jane Doe,"));
        assert!(body.contains("Customer Experience Team"));
    }
}
