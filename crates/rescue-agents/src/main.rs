use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use rescue_agents::collaborators::crm::HttpCrm;
use rescue_agents::collaborators::inventory::HttpInventory;
use rescue_agents::collaborators::llm::OpenAiGenerator;
use rescue_agents::collaborators::messaging::{HttpEmailSender, HttpSmsSender};
use rescue_agents::collaborators::orders::HttpOrderSystem;
use rescue_agents::collaborators::payments::HttpPayments;
use rescue_agents::collaborators::policy::StaticPolicyIndex;
use rescue_agents::collaborators::secrets::EnvSecretStore;
use rescue_agents::collaborators::transcripts::HttpTranscriptStore;
use rescue_agents::config::RescueConfig;
use rescue_agents::decision::DecisionSupport;
use rescue_agents::orchestrator::Orchestrator;
use rescue_agents::stages::{ActionStage, SolutionStage, TriageStage};

/// Process one negative-sentiment alert through the rescue pipeline.
#[derive(Parser)]
#[command(name = "rescue-agents", version)]
struct Cli {
    /// Inline alert JSON: {"transcript_id": "...", "customer_id": "...", "sentiment_score": 0.95}
    #[arg(long, conflicts_with = "alert_file")]
    alert: Option<String>,

    /// Path to a file containing the alert JSON.
    #[arg(long)]
    alert_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let raw = match (cli.alert, cli.alert_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("provide an alert via --alert or --alert-file"),
    };
    let event: serde_json::Value =
        serde_json::from_str(&raw).context("alert is not valid JSON")?;

    let config = RescueConfig::default();
    info!(
        llm = %config.llm.url,
        crm = %config.crm_base_url,
        "Rescue pipeline starting"
    );

    let secrets = Arc::new(EnvSecretStore);
    let timeout = config.request_timeout;

    let generator = Arc::new(OpenAiGenerator::new(&config.llm, secrets.clone(), timeout)?);
    let decision = DecisionSupport::new(generator);

    let crm = Arc::new(HttpCrm::new(&config.crm_base_url, secrets.clone(), timeout)?);
    let transcripts = Arc::new(HttpTranscriptStore::new(
        &config.transcript_base_url,
        secrets.clone(),
        timeout,
    )?);
    let orders = Arc::new(HttpOrderSystem::new(
        &config.order_base_url,
        secrets.clone(),
        timeout,
    )?);
    let inventory = Arc::new(HttpInventory::new(
        &config.inventory_base_url,
        secrets.clone(),
        timeout,
    )?);
    let payments = Arc::new(HttpPayments::new(
        &config.payment_base_url,
        secrets.clone(),
        timeout,
    )?);
    let email = Arc::new(HttpEmailSender::new(
        &config.from_email,
        secrets.clone(),
        timeout,
    )?);
    let sms = Arc::new(HttpSmsSender::new(
        &config.sms_from_number,
        secrets.clone(),
        timeout,
    )?);
    let policies = Arc::new(StaticPolicyIndex::default());

    let orchestrator = Orchestrator::new(
        Arc::new(TriageStage::new(
            crm.clone(),
            transcripts,
            decision.clone(),
            config.escalation.clone(),
        )),
        Arc::new(SolutionStage::new(
            decision.clone(),
            policies,
            orders.clone(),
            inventory,
        )),
        Arc::new(ActionStage::new(payments, orders, crm, email, sms, decision)),
    );

    let outcome = match orchestrator.process_event(&event).await {
        Ok(outcome) => outcome,
        Err(e) => bail!("alert rejected: {e}"),
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
