//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every subsystem from the validated configuration
//! - Resolve the target set before any host is contacted
//! - Run the checkup and deliver the summary
//!
//! # Design Decisions
//! - Fail fast: credential and inventory errors abort before dispatch
//! - Subsystems initialize in order, not concurrently
//! - The summary is sent even when the report could not be uploaded

use std::sync::Arc;

use thiserror::Error;

use crate::checks::CheckRegistry;
use crate::config::CheckupConfig;
use crate::inventory::{self, InventoryError};
use crate::notify::{DingTalkNotifier, LogNotifier, Notifier, NotifyError, Summary};
use crate::observability::metrics;
use crate::orchestrator::{
    DispatchSummary, Finalized, Orchestrator, OrchestratorError, PipelineContext, RunOutcome,
};
use crate::report::{CsvReportSink, Report, ReportLocation, SinkError};
use crate::transport::credential::CredentialError;
use crate::transport::{CredentialSet, SshTransport};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("run failed: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("report error: {0}")]
    Sink(#[from] SinkError),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// A completed checkup with its report delivered and summary sent.
#[derive(Debug)]
pub struct CheckupOutcome {
    pub report: Report,
    pub summary: Summary,
    pub location: ReportLocation,
    pub dispatch: DispatchSummary,
}

fn notifier_for(config: &CheckupConfig) -> Result<Box<dyn Notifier>, NotifyError> {
    Ok(match &config.notification.dingtalk_webhook {
        Some(webhook) => Box::new(DingTalkNotifier::new(webhook.as_str())?),
        None => Box::new(LogNotifier),
    })
}

/// Run one full checkup from a validated configuration.
pub async fn run(config: CheckupConfig) -> Result<CheckupOutcome, RunError> {
    let registry = Arc::new(CheckRegistry::builtin(&config.thresholds));
    tracing::debug!(registry = ?registry, "Check registry built");

    let credentials = Arc::new(CredentialSet::from_config(&config.credentials)?);
    tracing::info!(identities = credentials.len(), "Credentials loaded");

    let source = inventory::from_config(&config.inventory)?;
    let mut targets = source.list_target_hosts().await?;
    if let Some(file) = &config.exclude_hosts_file {
        targets = inventory::filter_excluded(targets, file).await?;
    }
    metrics::record_hosts(targets.len());
    tracing::info!(
        hosts = targets.len(),
        checks = config.checks.len(),
        "Target set resolved"
    );

    let notifier = notifier_for(&config)?;

    let ctx = PipelineContext {
        checks: Arc::new(config.checks.clone()),
        registry,
        transport: Arc::new(SshTransport::new(config.transport.clone())),
        credentials,
    };
    let sink = Arc::new(CsvReportSink::new(config.report.clone()));
    let orchestrator = Orchestrator::new(
        ctx,
        sink,
        config.dispatch.failure_channel_capacity,
        config.dispatch.max_concurrent_hosts,
    );

    let RunOutcome { finalized, dispatch } = orchestrator.run(targets).await?;
    let Finalized {
        report,
        summary,
        location,
    } = finalized;

    let notified = notifier.notify(&config.notification.title, &summary).await;
    if let Err(e) = &notified {
        tracing::error!(error = %e, "Failed to send summary");
    }

    let location = location?;
    notified?;

    Ok(CheckupOutcome {
        report,
        summary,
        location,
        dispatch,
    })
}
