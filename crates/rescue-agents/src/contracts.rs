//! Typed pipeline contracts and fail-closed decoding.
//!
//! Every object passed between stages is a typed contract defined here.
//! The orchestrator and stages MUST consume these types rather than raw
//! JSON — malformed model output is rejected (fail-closed) at the
//! decoding boundary and converted to the caller's deterministic
//! fallback, never passed through partially validated.
//!
//! ## Flow
//!
//! ```text
//! Alert ──triage──▶ TriageVerdict{Declined | Escalated(CaseFile)}
//! CaseFile ──solve──▶ SolutionSet{ranked Solutions, ProblemAnalysis, …}
//! CaseFile + SolutionSet ──act──▶ ActionReport{ExecutionResult, …}
//! all ──orchestrate──▶ OutcomeRecord
//! ```

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AlertError;

// ---------------------------------------------------------------------------
// Inbound alert
// ---------------------------------------------------------------------------

/// Inbound event signaling a negative-sentiment customer interaction.
///
/// Consumed once by the Triage stage and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub transcript_id: String,
    pub customer_id: String,
    /// 0 = neutral, 1 = extremely negative.
    pub sentiment_score: f64,
}

impl Alert {
    /// Validate a raw inbound event into an `Alert`.
    ///
    /// Exactly three fields are required; extra fields are ignored and
    /// missing or ill-typed fields reject the event before the pipeline
    /// starts.
    pub fn from_event(event: &Value) -> Result<Self, AlertError> {
        let transcript_id = event
            .get("transcript_id")
            .and_then(Value::as_str)
            .ok_or(AlertError::MissingField("transcript_id"))?;
        let customer_id = event
            .get("customer_id")
            .and_then(Value::as_str)
            .ok_or(AlertError::MissingField("customer_id"))?;
        let sentiment_score = event
            .get("sentiment_score")
            .and_then(Value::as_f64)
            .ok_or(AlertError::MissingField("sentiment_score"))?;

        if !(0.0..=1.0).contains(&sentiment_score) {
            return Err(AlertError::InvalidField {
                field: "sentiment_score",
                detail: format!("{sentiment_score} outside [0, 1]"),
            });
        }

        Ok(Self {
            transcript_id: transcript_id.to_string(),
            customer_id: customer_id.to_string(),
            sentiment_score,
        })
    }
}

// ---------------------------------------------------------------------------
// Customer snapshot
// ---------------------------------------------------------------------------

fn default_name() -> String {
    "Unknown".into()
}

fn default_tier() -> String {
    "Standard".into()
}

/// Read-only customer snapshot from the CRM collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Lifetime value in dollars.
    #[serde(default)]
    pub ltv: f64,
    /// Tier label: Standard / Gold / VIP / Premium / …
    #[serde(default = "default_tier")]
    pub status: String,
    #[serde(default)]
    pub recent_order_count: u32,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub avg_order_value: f64,
    #[serde(default)]
    pub support_tickets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_order_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Case file + triage verdict
// ---------------------------------------------------------------------------

/// The validated escalation packet handed from Triage to Solution/Action.
///
/// Invariant: any CaseFile that reaches the Solution or Action stage has
/// all three fields populated. Triage constructs it from authoritative
/// collaborator data, never directly from model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub customer_details: CustomerProfile,
    pub transcript_text: String,
    pub issue_summary: String,
}

impl CaseFile {
    /// Totality check: all three fields non-empty.
    pub fn is_complete(&self) -> bool {
        !self.customer_details.customer_id.trim().is_empty()
            && !self.transcript_text.trim().is_empty()
            && !self.issue_summary.trim().is_empty()
    }
}

/// Outcome of the Triage stage.
///
/// Escalation without a case file is unrepresentable here; the
/// orchestrator still re-checks completeness defensively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TriageVerdict {
    /// Do not escalate. Every unexpected condition during triage maps
    /// here (fail-closed) with the failure class embedded in `reason`.
    Declined { reason: String },
    /// Escalate with a complete case file.
    Escalated { case_file: CaseFile },
}

impl TriageVerdict {
    pub fn declined(reason: impl Into<String>) -> Self {
        Self::Declined {
            reason: reason.into(),
        }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Escalated { .. })
    }
}

/// Wire shape of the model's triage decision, before validation.
#[derive(Debug, Deserialize)]
pub struct TriageDecision {
    pub escalate: bool,
    #[serde(default)]
    pub case_file: Option<CaseFileDraft>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Model-proposed case file. Only `issue_summary` is trusted; the
/// canonical CaseFile is rebuilt from collaborator data.
#[derive(Debug, Deserialize)]
pub struct CaseFileDraft {
    #[serde(default)]
    pub customer_details: Option<Value>,
    #[serde(default)]
    pub transcript_text: Option<String>,
    #[serde(default)]
    pub issue_summary: Option<String>,
}

impl CaseFileDraft {
    /// All three fields present and non-empty.
    pub fn is_total(&self) -> bool {
        self.customer_details
            .as_ref()
            .map(|v| !v.is_null())
            .unwrap_or(false)
            && self
                .transcript_text
                .as_deref()
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false)
            && self
                .issue_summary
                .as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Problem analysis
// ---------------------------------------------------------------------------

/// Fixed six-category problem taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemCategory {
    /// Problems with orders (delays, wrong items, damaged goods).
    OrderIssue,
    /// Payment, refund, or billing problems.
    BillingIssue,
    /// Product defects or quality issues.
    ProductIssue,
    /// Poor service experience or support issues.
    ServiceIssue,
    /// Delivery problems or shipping concerns.
    ShippingIssue,
    /// Account access or profile problems.
    AccountIssue,
}

impl ProblemCategory {
    /// Lowercase fragment for policy-search queries, e.g. `order_issue`.
    pub fn query_fragment(self) -> &'static str {
        match self {
            Self::OrderIssue => "order_issue",
            Self::BillingIssue => "billing_issue",
            Self::ProductIssue => "product_issue",
            Self::ServiceIssue => "service_issue",
            Self::ShippingIssue => "shipping_issue",
            Self::AccountIssue => "account_issue",
        }
    }
}

impl fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OrderIssue => "ORDER_ISSUE",
            Self::BillingIssue => "BILLING_ISSUE",
            Self::ProductIssue => "PRODUCT_ISSUE",
            Self::ServiceIssue => "SERVICE_ISSUE",
            Self::ShippingIssue => "SHIPPING_ISSUE",
            Self::AccountIssue => "ACCOUNT_ISSUE",
        };
        f.write_str(s)
    }
}

/// Urgency as assessed from the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Classification of a case, produced and consumed within the Solution
/// stage only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProblemAnalysis {
    pub primary_category: ProblemCategory,
    #[serde(default)]
    pub secondary_categories: Vec<ProblemCategory>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub complaint_details: Vec<String>,
    pub urgency_level: UrgencyLevel,
}

impl ProblemAnalysis {
    /// Deterministic fallback when classification fails: the most
    /// conservative, human-escalatable category rather than a narrow guess.
    pub fn fallback() -> Self {
        Self {
            primary_category: ProblemCategory::ServiceIssue,
            secondary_categories: Vec::new(),
            order_id: None,
            products: Vec::new(),
            complaint_details: Vec::new(),
            urgency_level: UrgencyLevel::High,
        }
    }
}

// ---------------------------------------------------------------------------
// Solutions
// ---------------------------------------------------------------------------

/// Closed set of remediation actions the pipeline can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemedyAction {
    FullRefund,
    PartialRefund,
    ReshipOrder,
    GenerateCoupon,
    AccountCredit,
    ExpediteShipping,
    EscalateToManager,
    CustomAppeasement,
}

impl fmt::Display for RemedyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FullRefund => "full_refund",
            Self::PartialRefund => "partial_refund",
            Self::ReshipOrder => "reship_order",
            Self::GenerateCoupon => "generate_coupon",
            Self::AccountCredit => "account_credit",
            Self::ExpediteShipping => "expedite_shipping",
            Self::EscalateToManager => "escalate_to_manager",
            Self::CustomAppeasement => "custom_appeasement",
        };
        f.write_str(s)
    }
}

impl FromStr for RemedyAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_refund" => Ok(Self::FullRefund),
            "partial_refund" => Ok(Self::PartialRefund),
            "reship_order" => Ok(Self::ReshipOrder),
            "generate_coupon" => Ok(Self::GenerateCoupon),
            "account_credit" => Ok(Self::AccountCredit),
            "expedite_shipping" => Ok(Self::ExpediteShipping),
            "escalate_to_manager" => Ok(Self::EscalateToManager),
            "custom_appeasement" => Ok(Self::CustomAppeasement),
            _ => Err(()),
        }
    }
}

/// One candidate remediation action with parameters and rationale.
///
/// `action` is carried as the wire string and parsed into
/// [`RemedyAction`] at dispatch time, so that a solution with an
/// unrecognized tag survives decoding and fails fast at execution
/// instead of poisoning the whole list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    #[serde(default)]
    pub solution_id: i64,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_impact: Option<String>,
}

impl Solution {
    /// Lenient decode of one ranked-solutions entry.
    ///
    /// Missing required fields are reported (for the caller to log) but
    /// the entry is kept — downstream execution fails fast on missing
    /// params instead of dropping candidate remediations here.
    pub fn from_value(value: &Value) -> (Self, Vec<&'static str>) {
        let mut missing = Vec::new();
        for key in ["solution_id", "action", "params", "explanation"] {
            if value.get(key).is_none() {
                missing.push(key);
            }
        }

        let solution = Self {
            solution_id: value.get("solution_id").and_then(Value::as_i64).unwrap_or(0),
            action: value
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            params: value
                .get("params")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            explanation: value
                .get("explanation")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            estimated_cost: value
                .get("estimated_cost")
                .and_then(Value::as_str)
                .map(String::from),
            customer_impact: value
                .get("customer_impact")
                .and_then(Value::as_str)
                .map(String::from),
        };

        (solution, missing)
    }

    /// Synthetic fail-safe solution used when generation fails entirely:
    /// when automation cannot proceed confidently, defer to a human.
    pub fn escalation_fallback() -> Self {
        let mut params = Map::new();
        params.insert(
            "reason".into(),
            Value::String("Error in automated solution generation".into()),
        );
        Self {
            solution_id: 1,
            action: RemedyAction::EscalateToManager.to_string(),
            params,
            explanation: "Due to processing error, escalating to human manager".into(),
            estimated_cost: None,
            customer_impact: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Operational snapshots
// ---------------------------------------------------------------------------

/// Order snapshot from the order-management collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
}

/// Availability snapshot from the inventory collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInfo {
    #[serde(default)]
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub quantity_available: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restock_date: Option<String>,
    #[serde(default)]
    pub alternative_products: Vec<String>,
}

/// Operational context gathered for solution generation. Each lookup is
/// independent; absence of a key means that lookup failed or was not
/// applicable, never that the gather step aborted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_status: Option<Order>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inventory: Map<String, Value>,
}

/// Solution-stage output: the ranked solutions plus the context that
/// produced them, threaded downstream for communication and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSet {
    pub ranked_solutions: Vec<Solution>,
    pub problem_analysis: ProblemAnalysis,
    pub policy_context: String,
    pub operational_data: OperationalData,
}

// ---------------------------------------------------------------------------
// Execution + action report
// ---------------------------------------------------------------------------

/// Result of executing one remediation action against a collaborator.
///
/// Produced once per pipeline run, for the top-ranked solution only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ExecutionResult {
    pub fn ok(details: Map<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            action: None,
            details,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            action: None,
            details: Map::new(),
        }
    }

    pub fn failure_for(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            action: Some(action.to_string()),
            details: Map::new(),
        }
    }
}

/// Receipt from a messaging collaborator send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What was sent to the customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunicationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<SendReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_sent: Option<SendReceipt>,
    pub content_generated: bool,
}

/// Action-stage output.
///
/// `success` reflects whether the stage ran to completion, not whether
/// the underlying action succeeded — `execution_result.success` carries
/// the latter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_executed: Option<Solution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_sent: Option<CommunicationReport>,
    pub crm_logged: bool,
}

impl ActionReport {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            solution_executed: None,
            execution_result: None,
            communication_sent: None,
            crm_logged: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal outcome
// ---------------------------------------------------------------------------

/// Terminal status of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    NoActionRequired,
    Success,
    Error,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActionRequired => f.write_str("no_action_required"),
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// The terminal aggregate returned by the orchestrator. Nothing else is
/// persisted in-process; the worst observable failure is an
/// OutcomeRecord with `status = error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_file: Option<CaseFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solutions: Option<SolutionSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_taken: Option<ActionReport>,
    /// RFC 3339 completion timestamp.
    pub finished_at: String,
}

impl OutcomeRecord {
    fn stamped(status: OutcomeStatus) -> Self {
        Self {
            status,
            customer_id: None,
            message: None,
            case_file: None,
            solutions: None,
            actions_taken: None,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn no_action_required(customer_id: &str, reason: impl Into<String>) -> Self {
        let mut record = Self::stamped(OutcomeStatus::NoActionRequired);
        record.customer_id = Some(customer_id.to_string());
        record.message = Some(reason.into());
        record
    }

    pub fn error(customer_id: Option<&str>, message: impl Into<String>) -> Self {
        let mut record = Self::stamped(OutcomeStatus::Error);
        record.customer_id = customer_id.map(String::from);
        record.message = Some(message.into());
        record
    }

    pub fn success(
        customer_id: &str,
        case_file: CaseFile,
        solutions: SolutionSet,
        actions_taken: ActionReport,
    ) -> Self {
        let mut record = Self::stamped(OutcomeStatus::Success);
        record.customer_id = Some(customer_id.to_string());
        record.case_file = Some(case_file);
        record.solutions = Some(solutions);
        record.actions_taken = Some(actions_taken);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(customer_id: &str) -> CustomerProfile {
        CustomerProfile {
            customer_id: customer_id.into(),
            name: "Jane Doe".into(),
            email: Some("jane@example.com".into()),
            phone: None,
            ltv: 1500.0,
            status: "Gold".into(),
            recent_order_count: 3,
            total_orders: 12,
            avg_order_value: 80.0,
            support_tickets: 1,
            satisfaction_score: None,
            join_date: None,
            last_order_date: None,
        }
    }

    // -- Alert --

    #[test]
    fn test_alert_from_valid_event() {
        let event = json!({
            "transcript_id": "T12345",
            "customer_id": "C67890",
            "sentiment_score": 0.95,
            "source": "ignored-extra-field"
        });
        let alert = Alert::from_event(&event).unwrap();
        assert_eq!(alert.transcript_id, "T12345");
        assert_eq!(alert.customer_id, "C67890");
        assert_eq!(alert.sentiment_score, 0.95);
    }

    #[test]
    fn test_alert_missing_field_rejected() {
        let event = json!({"transcript_id": "T1", "sentiment_score": 0.5});
        let err = Alert::from_event(&event).unwrap_err();
        assert!(err.to_string().contains("customer_id"));
    }

    #[test]
    fn test_alert_wrong_type_rejected() {
        let event = json!({
            "transcript_id": "T1",
            "customer_id": "C1",
            "sentiment_score": "very negative"
        });
        assert!(Alert::from_event(&event).is_err());
    }

    #[test]
    fn test_alert_out_of_range_sentiment_rejected() {
        let event = json!({
            "transcript_id": "T1",
            "customer_id": "C1",
            "sentiment_score": 1.5
        });
        assert!(Alert::from_event(&event).is_err());
    }

    // -- CustomerProfile --

    #[test]
    fn test_customer_profile_defaults_on_sparse_payload() {
        let sparse: CustomerProfile =
            serde_json::from_value(json!({"customer_id": "C1"})).unwrap();
        assert_eq!(sparse.name, "Unknown");
        assert_eq!(sparse.status, "Standard");
        assert_eq!(sparse.ltv, 0.0);
        assert!(sparse.email.is_none());
    }

    // -- CaseFile --

    #[test]
    fn test_case_file_completeness() {
        let complete = CaseFile {
            customer_details: profile("C1"),
            transcript_text: "transcript".into(),
            issue_summary: "summary".into(),
        };
        assert!(complete.is_complete());

        let blank_summary = CaseFile {
            issue_summary: "   ".into(),
            ..complete.clone()
        };
        assert!(!blank_summary.is_complete());

        let blank_transcript = CaseFile {
            transcript_text: String::new(),
            ..complete
        };
        assert!(!blank_transcript.is_complete());
    }

    #[test]
    fn test_case_file_draft_totality() {
        let total: CaseFileDraft = serde_json::from_value(json!({
            "customer_details": {"customer_id": "C1"},
            "transcript_text": "text",
            "issue_summary": "summary"
        }))
        .unwrap();
        assert!(total.is_total());

        let missing: CaseFileDraft = serde_json::from_value(json!({
            "customer_details": {"customer_id": "C1"},
            "transcript_text": "text"
        }))
        .unwrap();
        assert!(!missing.is_total());
    }

    // -- Enums --

    #[test]
    fn test_problem_category_wire_names() {
        let json = serde_json::to_string(&ProblemCategory::OrderIssue).unwrap();
        assert_eq!(json, "\"ORDER_ISSUE\"");
        let back: ProblemCategory = serde_json::from_str("\"SHIPPING_ISSUE\"").unwrap();
        assert_eq!(back, ProblemCategory::ShippingIssue);
        assert_eq!(ProblemCategory::BillingIssue.query_fragment(), "billing_issue");
    }

    #[test]
    fn test_urgency_wire_names() {
        let level: UrgencyLevel = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(level, UrgencyLevel::Critical);
    }

    #[test]
    fn test_remedy_action_round_trip() {
        for action in [
            RemedyAction::FullRefund,
            RemedyAction::PartialRefund,
            RemedyAction::ReshipOrder,
            RemedyAction::GenerateCoupon,
            RemedyAction::AccountCredit,
            RemedyAction::ExpediteShipping,
            RemedyAction::EscalateToManager,
            RemedyAction::CustomAppeasement,
        ] {
            let tag = action.to_string();
            assert_eq!(tag.parse::<RemedyAction>().unwrap(), action);
        }
        assert!("store_visit".parse::<RemedyAction>().is_err());
    }

    #[test]
    fn test_problem_analysis_fallback() {
        let fallback = ProblemAnalysis::fallback();
        assert_eq!(fallback.primary_category, ProblemCategory::ServiceIssue);
        assert_eq!(fallback.urgency_level, UrgencyLevel::High);
        assert!(fallback.order_id.is_none());
    }

    // -- Solution --

    #[test]
    fn test_solution_lenient_decode_complete() {
        let value = json!({
            "solution_id": 1,
            "action": "full_refund",
            "params": {"order_id": "O-1", "amount": 75.50},
            "explanation": "Refund for late delivery",
            "estimated_cost": "$75.50"
        });
        let (solution, missing) = Solution::from_value(&value);
        assert!(missing.is_empty());
        assert_eq!(solution.action, "full_refund");
        assert_eq!(solution.params["order_id"], "O-1");
        assert_eq!(solution.estimated_cost.as_deref(), Some("$75.50"));
    }

    #[test]
    fn test_solution_lenient_decode_keeps_incomplete_entry() {
        let value = json!({"action": "generate_coupon"});
        let (solution, missing) = Solution::from_value(&value);
        assert_eq!(solution.action, "generate_coupon");
        assert!(missing.contains(&"solution_id"));
        assert!(missing.contains(&"params"));
        assert!(missing.contains(&"explanation"));
    }

    #[test]
    fn test_escalation_fallback_shape() {
        let fallback = Solution::escalation_fallback();
        assert_eq!(fallback.action, "escalate_to_manager");
        assert_eq!(
            fallback.explanation,
            "Due to processing error, escalating to human manager"
        );
        assert!(fallback.params.contains_key("reason"));
    }

    // -- ExecutionResult / OutcomeRecord --

    #[test]
    fn test_execution_result_flattens_details() {
        let mut details = Map::new();
        details.insert("refund_id".into(), json!("re_123"));
        let result = ExecutionResult::ok(details);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["refund_id"], "re_123");
    }

    #[test]
    fn test_outcome_status_wire_names() {
        let value = serde_json::to_value(OutcomeStatus::NoActionRequired).unwrap();
        assert_eq!(value, "no_action_required");
        assert_eq!(OutcomeStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_outcome_record_error_carries_customer_id() {
        let record = OutcomeRecord::error(Some("C1"), "boom");
        assert_eq!(record.status, OutcomeStatus::Error);
        assert_eq!(record.customer_id.as_deref(), Some("C1"));
        assert_eq!(record.message.as_deref(), Some("boom"));
    }
}
