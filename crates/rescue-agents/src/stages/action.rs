//! Action stage: execute the top-ranked solution, notify the customer,
//! log the resolution.
//!
//! Only the highest-ranked solution is ever executed automatically;
//! lower-ranked candidates exist for the audit trail and for a human
//! picking up an escalation. Execution failure never propagates as an
//! uncaught fault — it is data in the report.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::collaborators::crm::CustomerRecords;
use crate::collaborators::messaging::{clamp_sms_body, EmailSender, SmsSender};
use crate::collaborators::orders::OrderSystem;
use crate::collaborators::payments::PaymentGateway;
use crate::contracts::{
    ActionReport, CaseFile, CommunicationReport, CustomerProfile, ExecutionResult, RemedyAction,
    SendReceipt, Solution, SolutionSet,
};
use crate::decision::DecisionSupport;
use crate::error::CollaboratorError;
use crate::prompts;
use crate::stages::Act;

// Canned SMS notifications — reserved for confirmed-successful outcomes
// and never model-generated.
const SMS_REFUND: &str = "Good news! Your refund has been processed and should appear in your \
    account within 3-5 business days. Thank you for your patience.";
const SMS_COUPON: &str = "We've added a special discount to your account as an apology for the \
    recent issue. Check your email for details!";
const SMS_RESHIP: &str = "Your replacement order has been shipped with expedited delivery. \
    You'll receive tracking information shortly.";
const SMS_GENERIC: &str = "We've resolved your recent concern. Please check your email for full \
    details. Thank you for your patience!";

fn sms_template(action: &str) -> &'static str {
    match action {
        "full_refund" => SMS_REFUND,
        "generate_coupon" => SMS_COUPON,
        "reship_order" => SMS_RESHIP,
        _ => SMS_GENERIC,
    }
}

fn str_param<'a>(solution: &'a Solution, key: &str) -> Option<&'a str> {
    solution.params.get(key).and_then(Value::as_str)
}

fn f64_param(solution: &Solution, key: &str) -> Option<f64> {
    solution.params.get(key).and_then(Value::as_f64)
}

fn missing_param(name: &str) -> ExecutionResult {
    ExecutionResult::failure(format!("Missing required parameter: {name}"))
}

pub struct ActionStage {
    payments: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderSystem>,
    crm: Arc<dyn CustomerRecords>,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    decision: DecisionSupport,
}

impl ActionStage {
    pub fn new(
        payments: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderSystem>,
        crm: Arc<dyn CustomerRecords>,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        decision: DecisionSupport,
    ) -> Self {
        Self {
            payments,
            orders,
            crm,
            email,
            sms,
            decision,
        }
    }

    /// Dispatch the solution to its collaborator. Each action maps 1:1 to
    /// one collaborator call; any collaborator error is converted to a
    /// failed ExecutionResult.
    async fn execute(&self, solution: &Solution, customer: &CustomerProfile) -> ExecutionResult {
        let tag = solution.action.as_str();
        info!(action = tag, "Executing action");

        let Ok(action) = tag.parse::<RemedyAction>() else {
            warn!(action = tag, "Unknown action");
            return ExecutionResult::failure(format!("Unknown action: {tag}"));
        };

        let outcome: Result<ExecutionResult, CollaboratorError> = match action {
            RemedyAction::FullRefund => match str_param(solution, "order_id") {
                Some(order_id) => {
                    self.payments
                        .refund(
                            order_id,
                            f64_param(solution, "amount"),
                            "Customer experience rescue",
                        )
                        .await
                }
                None => Ok(missing_param("order_id")),
            },
            RemedyAction::PartialRefund => match (
                str_param(solution, "order_id"),
                f64_param(solution, "amount"),
            ) {
                (Some(order_id), Some(amount)) => {
                    self.payments
                        .refund(order_id, Some(amount), "Partial compensation")
                        .await
                }
                (None, _) => Ok(missing_param("order_id")),
                (_, None) => Ok(missing_param("amount")),
            },
            RemedyAction::ReshipOrder => match str_param(solution, "order_id") {
                Some(order_id) => self.orders.create_replacement(order_id, true).await,
                None => Ok(missing_param("order_id")),
            },
            RemedyAction::GenerateCoupon => match f64_param(solution, "value") {
                Some(value) => {
                    let unit = str_param(solution, "unit").unwrap_or("percent");
                    self.payments
                        .create_coupon(&customer.customer_id, value, unit)
                        .await
                }
                None => Ok(missing_param("value")),
            },
            RemedyAction::AccountCredit => match f64_param(solution, "amount") {
                Some(amount) => {
                    self.crm
                        .add_credit(&customer.customer_id, amount, "Service recovery credit")
                        .await
                }
                None => Ok(missing_param("amount")),
            },
            RemedyAction::ExpediteShipping => match str_param(solution, "order_id") {
                Some(order_id) => self.orders.upgrade_shipping(order_id, "express").await,
                None => Ok(missing_param("order_id")),
            },
            RemedyAction::EscalateToManager => {
                // Local no-op success: the escalation reason travels in the
                // result, no external call is made.
                let reason = str_param(solution, "reason")
                    .unwrap_or("Complex case requiring human intervention");
                let mut details = Map::new();
                details.insert(
                    "message".into(),
                    Value::String("Case escalated to human manager".into()),
                );
                details.insert("escalation_reason".into(), Value::String(reason.into()));
                Ok(ExecutionResult {
                    success: true,
                    error: None,
                    action: Some("escalated".into()),
                    details,
                })
            }
            RemedyAction::CustomAppeasement => {
                // No automated executor; a human follows up from the report.
                warn!(action = tag, "Unknown action");
                Ok(ExecutionResult::failure(format!("Unknown action: {tag}")))
            }
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(action = tag, error = %e, "Action execution failed");
                ExecutionResult::failure_for(tag, e.to_string())
            }
        }
    }

    /// Generate and send the customer communication. The email body is
    /// model-generated with a fixed apology fallback; SMS uses canned
    /// templates and is gated on a confirmed-successful execution.
    async fn communicate(
        &self,
        case_file: &CaseFile,
        solution: &Solution,
        execution_result: &ExecutionResult,
    ) -> CommunicationReport {
        let customer = &case_file.customer_details;

        let prompt = prompts::email_prompt(
            customer,
            &case_file.issue_summary,
            solution,
            execution_result,
        );
        let body = match self.decision.compose(&prompt).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) | Err(_) => {
                warn!("Email generation failed — using apology template");
                prompts::fallback_email(&customer.name)
            }
        };

        let mut report = CommunicationReport {
            content_generated: true,
            ..Default::default()
        };

        if let Some(address) = &customer.email {
            let subject = format!("We've Resolved Your Recent Concern - {}", customer.name);
            report.email_sent = Some(match self.email.send_email(address, &subject, &body).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    error!(error = %e, "Email send failed");
                    SendReceipt {
                        success: false,
                        message_id: None,
                        error: Some(e.to_string()),
                    }
                }
            });
        }

        // SMS is reserved for confirmed-successful outcomes.
        if execution_result.success {
            if let Some(number) = &customer.phone {
                let body = clamp_sms_body(sms_template(&solution.action));
                report.sms_sent = Some(match self.sms.send_sms(number, &body).await {
                    Ok(receipt) => receipt,
                    Err(e) => {
                        error!(error = %e, "SMS send failed");
                        SendReceipt {
                            success: false,
                            message_id: None,
                            error: Some(e.to_string()),
                        }
                    }
                });
            }
        }

        report
    }

    /// Append the structured resolution note to the customer record.
    /// Missing customer id is a silent no-op returning failure.
    async fn log_resolution(
        &self,
        case_file: &CaseFile,
        solution: &Solution,
        execution_result: &ExecutionResult,
    ) -> bool {
        let customer_id = &case_file.customer_details.customer_id;
        if customer_id.trim().is_empty() {
            return false;
        }

        let status = if execution_result.success {
            "SUCCESS"
        } else {
            "FAILED"
        };
        let note = format!(
            "CX RESCUE INCIDENT - {issue}\n\
             \n\
             RESOLUTION DETAILS:\n\
             - Action Taken: {action}\n\
             - Execution Status: {status}\n\
             - Solution Explanation: {explanation}\n\
             - Logged At: {timestamp}\n\
             \n\
             CUSTOMER COMMUNICATION:\n\
             - Email sent to customer\n\
             - Issue resolved automatically by the rescue pipeline\n\
             \n\
             FOLLOW-UP:\n\
             - Monitor customer satisfaction\n\
             - Ensure resolution effectiveness",
            issue = case_file.issue_summary,
            action = solution.action,
            status = status,
            explanation = solution.explanation,
            timestamp = chrono::Utc::now().to_rfc3339(),
        );

        match self.crm.append_note(customer_id, &note).await {
            Ok(accepted) => {
                if accepted {
                    info!(customer_id = %customer_id, "Logged incident to CRM");
                } else {
                    error!(customer_id = %customer_id, "CRM rejected resolution note");
                }
                accepted
            }
            Err(e) => {
                error!(customer_id = %customer_id, error = %e, "CRM logging failed");
                false
            }
        }
    }
}

#[async_trait]
impl Act for ActionStage {
    async fn process(&self, case_file: &CaseFile, solutions: &SolutionSet) -> ActionReport {
        let Some(top_solution) = solutions.ranked_solutions.first() else {
            return ActionReport::failure("No solutions provided");
        };

        let execution_result = self
            .execute(top_solution, &case_file.customer_details)
            .await;
        let communication = self
            .communicate(case_file, top_solution, &execution_result)
            .await;
        let crm_logged = self
            .log_resolution(case_file, top_solution, &execution_result)
            .await;

        ActionReport {
            success: true,
            error: None,
            solution_executed: Some(top_solution.clone()),
            execution_result: Some(execution_result),
            communication_sent: Some(communication),
            crm_logged,
        }
    }
}
