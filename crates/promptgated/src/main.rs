//! promptgated - evaluation daemon
//!
//! Runs the full evaluation on a fixed schedule (`PROMPTGATE_SCHEDULE_SECS`,
//! zero disables it) and once at start when `PROMPTGATE_RUN_ON_START=true`.
//! Both paths go through the same trigger loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use promptgate_core::trigger::{spawn, TriggerHandle};
use promptgate_core::{
    EvaluationOrchestrator, EvaluationService, InferenceClient, PipelineConfig,
    TemplateVersionStore, METRICS,
};
use promptgate_state::{SurrealHandle, SurrealStore};
use tracing::{info, warn, Level};

fn build_service(
    store: Arc<SurrealStore>,
    inference: Arc<dyn InferenceClient>,
    config: &PipelineConfig,
) -> EvaluationService {
    let templates = Arc::new(TemplateVersionStore::new(store.clone()));
    let orchestrator = EvaluationOrchestrator::new(
        templates,
        store.clone(),
        store,
        inference,
        config.model.clone(),
        config.inference_timeout,
    )
    .with_ideas(true);
    EvaluationService::new(Arc::new(orchestrator))
}

async fn run_startup_evaluation(handle: &TriggerHandle) {
    match handle.run_now().await {
        Ok(report) => info!(
            report_id = %report.report_id,
            passed = report.aggregate.pass,
            "startup evaluation finished"
        ),
        Err(err) => warn!(error = %err, "startup evaluation failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let json = std::env::var("PROMPTGATE_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    promptgate_core::init_tracing(json, Level::INFO);

    let config = PipelineConfig::from_env().context("invalid promptgate configuration")?;
    let handle = SurrealHandle::setup_from_env()
        .await
        .context("Failed to connect to promptgate database")?;
    let inference = config
        .inference_client()
        .context("Failed to create inference client")?;
    let store = Arc::new(SurrealStore::new(Arc::new(handle)));

    let schedule = config.schedule_interval();
    info!(
        version = promptgate_core::VERSION,
        model = %config.model,
        schedule_secs = schedule.map(|s| s.as_secs()),
        run_on_start = config.run_on_start,
        "promptgated starting"
    );

    let (trigger, join) = spawn(build_service(store, inference, &config), schedule);
    if config.run_on_start {
        run_startup_evaluation(&trigger).await;
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("shutdown requested");
    trigger.shutdown();
    join.await.context("trigger loop panicked")?;
    METRICS.flush();
    Ok(())
}
