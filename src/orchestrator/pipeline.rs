//! Sequential check pipeline for one host.
//!
//! # Responsibilities
//! - Run configured checks in order against a single host
//! - Turn every kind of failure into a [`FailureEntry`]
//! - Stop at the first connection failure and mark the rest as not attempted
//!
//! # Design Decisions
//! - Checks within a host are sequential; hosts run concurrently elsewhere
//! - Execution and evaluation failures are recorded and the pipeline moves on
//! - Connections are always closed before the record is returned

use std::sync::Arc;

use crate::checks::{CheckOutcome, CheckRegistry};
use crate::config::CheckConfig;
use crate::observability::metrics;
use crate::orchestrator::broker::ConnectionBroker;
use crate::orchestrator::{FailureEntry, FailureRecord, Host};
use crate::transport::{CredentialSet, Transport};

/// Everything a host pipeline needs, shared read-only across host tasks.
#[derive(Clone)]
pub struct PipelineContext {
    pub checks: Arc<Vec<CheckConfig>>,
    pub registry: Arc<CheckRegistry>,
    pub transport: Arc<dyn Transport>,
    pub credentials: Arc<CredentialSet>,
}

/// Run every applicable check on `host`.
///
/// Returns `None` when nothing failed.
pub async fn run_pipeline(host: &Host, ctx: &PipelineContext) -> Option<FailureRecord> {
    let mut broker = ConnectionBroker::new(
        host.clone(),
        ctx.transport.clone(),
        ctx.credentials.clone(),
    );
    let mut record = FailureRecord {
        host: host.clone(),
        entries: Vec::new(),
        not_attempted: Vec::new(),
    };

    for (idx, check) in ctx.checks.iter().enumerate() {
        if check.excludes(host) {
            tracing::info!(kind = %check.kind, "Host excluded from check, skipping");
            metrics::record_check(&check.kind, "excluded");
            continue;
        }

        let connection = match broker.connection_for(&check.identity).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(identity = %check.identity, error = %e, "Connection failed, aborting host");
                record.entries.push(FailureEntry::connection(host, &e));
                record.not_attempted = ctx.checks[idx..]
                    .iter()
                    .filter(|c| !c.excludes(host))
                    .map(|c| {
                        metrics::record_check(&c.kind, "not_attempted");
                        c.kind.clone()
                    })
                    .collect();
                break;
            }
        };

        let output = match connection.execute(&check.command).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(kind = %check.kind, error = %e, "Command failed");
                metrics::record_check(&check.kind, "error");
                record
                    .entries
                    .push(FailureEntry::check(host, &check.kind, &check.command, &e));
                continue;
            }
        };

        match ctx.registry.evaluate(&check.kind, &output.stdout) {
            Ok(CheckOutcome::Pass) => {
                tracing::debug!(kind = %check.kind, "Check passed");
                metrics::record_check(&check.kind, "pass");
            }
            Ok(CheckOutcome::Fail(detail)) => {
                tracing::info!(kind = %check.kind, detail = %detail, "Check failed");
                metrics::record_check(&check.kind, "fail");
                record
                    .entries
                    .push(FailureEntry::check(host, &check.kind, &check.command, detail));
            }
            Err(e) => {
                tracing::warn!(kind = %check.kind, error = %e, "Check output could not be evaluated");
                metrics::record_check(&check.kind, "error");
                record
                    .entries
                    .push(FailureEntry::check(host, &check.kind, &check.command, &e));
            }
        }
    }

    broker.close_all().await;

    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}
