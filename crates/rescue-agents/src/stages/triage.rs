//! Triage stage: validate the alert, gather context, decide escalation.
//!
//! Fail-closed throughout: every unexpected condition — unknown
//! customer, missing transcript, collaborator failure, malformed model
//! output — maps to "do not escalate" with the failure class embedded
//! in the reason. Only a well-formed, validated escalate-with-case-file
//! decision proceeds downstream.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::collaborators::crm::CustomerRecords;
use crate::collaborators::transcripts::TranscriptStore;
use crate::config::EscalationPolicy;
use crate::contracts::{Alert, CaseFile, TriageDecision, TriageVerdict};
use crate::decision::DecisionSupport;
use crate::error::CollaboratorError;
use crate::prompts;
use crate::stages::Triage;

pub struct TriageStage {
    crm: Arc<dyn CustomerRecords>,
    transcripts: Arc<dyn TranscriptStore>,
    decision: DecisionSupport,
    policy: EscalationPolicy,
}

impl TriageStage {
    pub fn new(
        crm: Arc<dyn CustomerRecords>,
        transcripts: Arc<dyn TranscriptStore>,
        decision: DecisionSupport,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            crm,
            transcripts,
            decision,
            policy,
        }
    }

    async fn assess(&self, alert: &Alert) -> Result<TriageVerdict, CollaboratorError> {
        // No escalation without identity.
        let Some(profile) = self.crm.lookup(&alert.customer_id).await? else {
            warn!(customer_id = %alert.customer_id, "Customer not found — declining");
            return Ok(TriageVerdict::declined("Customer not found in CRM"));
        };

        let transcript = match self.transcripts.fetch(&alert.transcript_id).await? {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                warn!(transcript_id = %alert.transcript_id, "Transcript not found — declining");
                return Ok(TriageVerdict::declined("Transcript not found"));
            }
        };

        let prompt =
            prompts::triage_prompt(&profile, alert.sentiment_score, &transcript, &self.policy);
        let decision = self
            .decision
            .decide::<TriageDecision, _>(&prompt, |d| {
                if !d.escalate {
                    return Ok(());
                }
                match &d.case_file {
                    Some(draft) if draft.is_total() => Ok(()),
                    Some(_) => Err("escalation case file incomplete".into()),
                    None => Err("escalation decision missing case_file".into()),
                }
            })
            .await;

        match decision {
            Ok(d) if d.escalate => {
                // The validator guaranteed a total draft; only the model's
                // issue summary is trusted — the canonical case file is
                // rebuilt from authoritative collaborator data.
                let issue_summary = d
                    .case_file
                    .and_then(|draft| draft.issue_summary)
                    .unwrap_or_default();
                info!(customer_id = %alert.customer_id, "Triage decision: ESCALATE");
                Ok(TriageVerdict::Escalated {
                    case_file: CaseFile {
                        customer_details: profile,
                        transcript_text: transcript,
                        issue_summary,
                    },
                })
            }
            Ok(d) => {
                info!(customer_id = %alert.customer_id, "Triage decision: NO ESCALATION");
                Ok(TriageVerdict::declined(d.reason.unwrap_or_else(|| {
                    "Alert did not meet escalation criteria".into()
                })))
            }
            Err(e) => {
                warn!(error = %e, "Escalation analysis failed — declining");
                Ok(TriageVerdict::declined(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Triage for TriageStage {
    async fn process(&self, alert: &Alert) -> TriageVerdict {
        match self.assess(alert).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(customer_id = %alert.customer_id, error = %e, "Triage processing error");
                TriageVerdict::declined(format!("Processing error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::llm::TextGenerator;
    use crate::contracts::CustomerProfile;
    use serde_json::json;

    struct FakeCrm(Option<CustomerProfile>);

    #[async_trait]
    impl CustomerRecords for FakeCrm {
        async fn lookup(
            &self,
            _customer_id: &str,
        ) -> Result<Option<CustomerProfile>, CollaboratorError> {
            Ok(self.0.clone())
        }

        async fn append_note(&self, _: &str, _: &str) -> Result<bool, CollaboratorError> {
            Ok(true)
        }

        async fn add_credit(
            &self,
            _: &str,
            _: f64,
            _: &str,
        ) -> Result<crate::contracts::ExecutionResult, CollaboratorError> {
            Ok(crate::contracts::ExecutionResult::ok(Default::default()))
        }
    }

    struct FakeTranscripts(Option<String>);

    #[async_trait]
    impl TranscriptStore for FakeTranscripts {
        async fn fetch(&self, _: &str) -> Result<Option<String>, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    struct Scripted(String);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _: &str) -> Result<String, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    fn gold_customer() -> CustomerProfile {
        serde_json::from_value(json!({
            "customer_id": "C1",
            "name": "Jane Doe",
            "ltv": 1500.0,
            "status": "Gold"
        }))
        .unwrap()
    }

    fn alert() -> Alert {
        Alert {
            transcript_id: "T1".into(),
            customer_id: "C1".into(),
            sentiment_score: 0.95,
        }
    }

    fn stage(
        crm: FakeCrm,
        transcripts: FakeTranscripts,
        model_response: &str,
    ) -> TriageStage {
        TriageStage::new(
            Arc::new(crm),
            Arc::new(transcripts),
            DecisionSupport::new(Arc::new(Scripted(model_response.to_string()))),
            EscalationPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_unknown_customer_fails_closed() {
        let stage = stage(
            FakeCrm(None),
            FakeTranscripts(Some("angry transcript".into())),
            "{\"escalate\": true}",
        );
        match stage.process(&alert()).await {
            TriageVerdict::Declined { reason } => {
                assert_eq!(reason, "Customer not found in CRM")
            }
            other => panic!("expected declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_transcript_fails_closed() {
        let stage = stage(FakeCrm(Some(gold_customer())), FakeTranscripts(None), "{}");
        match stage.process(&alert()).await {
            TriageVerdict::Declined { reason } => assert_eq!(reason, "Transcript not found"),
            other => panic!("expected declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_transcript_fails_closed() {
        let stage = stage(
            FakeCrm(Some(gold_customer())),
            FakeTranscripts(Some("   ".into())),
            "{}",
        );
        assert!(!stage.process(&alert()).await.is_escalation());
    }

    #[tokio::test]
    async fn test_valid_escalation_builds_canonical_case_file() {
        let response = json!({
            "escalate": true,
            "case_file": {
                "customer_details": {"customer_id": "C1"},
                "transcript_text": "model echo (ignored)",
                "issue_summary": "Customer received a damaged order twice"
            }
        })
        .to_string();
        let stage = stage(
            FakeCrm(Some(gold_customer())),
            FakeTranscripts(Some("this is the worst experience".into())),
            &response,
        );

        match stage.process(&alert()).await {
            TriageVerdict::Escalated { case_file } => {
                assert!(case_file.is_complete());
                assert_eq!(case_file.customer_details.status, "Gold");
                // Transcript comes from the store, not the model echo.
                assert_eq!(case_file.transcript_text, "this is the worst experience");
                assert_eq!(
                    case_file.issue_summary,
                    "Customer received a damaged order twice"
                );
            }
            other => panic!("expected escalation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_escalation_without_case_file_is_analysis_error() {
        let stage = stage(
            FakeCrm(Some(gold_customer())),
            FakeTranscripts(Some("worst experience ever".into())),
            "{\"escalate\": true}",
        );
        match stage.process(&alert()).await {
            TriageVerdict::Declined { reason } => {
                assert!(reason.starts_with("Analysis error:"), "reason = {reason}")
            }
            other => panic!("expected declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_model_output_declines() {
        let stage = stage(
            FakeCrm(Some(gold_customer())),
            FakeTranscripts(Some("transcript".into())),
            "I think we should probably escalate this one",
        );
        match stage.process(&alert()).await {
            TriageVerdict::Declined { reason } => {
                assert!(reason.starts_with("Analysis error:"))
            }
            other => panic!("expected declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_escalation_passes_model_reason_through() {
        let stage = stage(
            FakeCrm(Some(gold_customer())),
            FakeTranscripts(Some("a bit annoyed".into())),
            "{\"escalate\": false, \"reason\": \"mild complaint only\"}",
        );
        match stage.process(&alert()).await {
            TriageVerdict::Declined { reason } => assert_eq!(reason, "mild complaint only"),
            other => panic!("expected declined, got {other:?}"),
        }
    }
}
