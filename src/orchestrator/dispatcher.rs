//! Fan-out of host pipelines.
//!
//! # Responsibilities
//! - Spawn one task per target host
//! - Forward non-empty failure records to the aggregator
//! - Wait for every task before returning, then release the channel
//!
//! # Design Decisions
//! - Concurrency is unlimited by default; a semaphore caps it when configured
//! - A host task that dies is reported as that host's connection failure
//! - Sends block when the channel is full, which throttles host tasks

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::orchestrator::pipeline::{run_pipeline, PipelineContext};
use crate::orchestrator::{FailureEntry, FailureRecord, Host};

/// What happened to the host tasks of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub hosts: usize,
    /// Records handed to the channel, including those for crashed tasks.
    pub records_sent: usize,
    /// Host tasks that panicked or were cancelled.
    pub crashed: usize,
}

pub struct HostDispatcher {
    ctx: PipelineContext,
    limit: Option<Arc<Semaphore>>,
}

impl HostDispatcher {
    /// `max_concurrent_hosts == 0` means one task per host with no cap.
    pub fn new(ctx: PipelineContext, max_concurrent_hosts: usize) -> Self {
        let limit = (max_concurrent_hosts > 0).then(|| Arc::new(Semaphore::new(max_concurrent_hosts)));
        Self { ctx, limit }
    }

    /// Run every host and return once all of them have finished.
    ///
    /// `tx` is consumed; when this returns, no sender remains and the
    /// aggregator sees the channel close.
    pub async fn dispatch(
        &self,
        hosts: &BTreeSet<Host>,
        tx: mpsc::Sender<FailureRecord>,
    ) -> DispatchSummary {
        tracing::info!(hosts = hosts.len(), "Dispatching host pipelines");

        let handles: Vec<(Host, JoinHandle<bool>)> = hosts
            .iter()
            .map(|host| {
                let handle = tokio::spawn(
                    host_task(host.clone(), self.ctx.clone(), self.limit.clone(), tx.clone())
                        .instrument(tracing::info_span!("host", host = %host)),
                );
                (host.clone(), handle)
            })
            .collect();

        let mut summary = DispatchSummary {
            hosts: handles.len(),
            ..DispatchSummary::default()
        };

        for (host, handle) in handles {
            match handle.await {
                Ok(true) => summary.records_sent += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(host = %host, error = %e, "Host task crashed");
                    summary.crashed += 1;
                    let not_attempted = self
                        .ctx
                        .checks
                        .iter()
                        .filter(|c| !c.excludes(&host))
                        .map(|c| c.kind.clone())
                        .collect();
                    let record = FailureRecord {
                        entries: vec![FailureEntry::connection(&host, format!("host task aborted: {e}"))],
                        host,
                        not_attempted,
                    };
                    if tx.send(record).await.is_ok() {
                        summary.records_sent += 1;
                    }
                }
            }
        }

        drop(tx);
        tracing::info!(
            hosts = summary.hosts,
            records = summary.records_sent,
            crashed = summary.crashed,
            "All host pipelines finished"
        );
        summary
    }
}

/// Returns whether a record was delivered.
async fn host_task(
    host: Host,
    ctx: PipelineContext,
    limit: Option<Arc<Semaphore>>,
    tx: mpsc::Sender<FailureRecord>,
) -> bool {
    let _permit = match limit {
        Some(semaphore) => match semaphore.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => return false,
        },
        None => None,
    };

    let Some(record) = run_pipeline(&host, &ctx).await else {
        tracing::debug!("Host passed every check");
        return false;
    };

    match tx.send(record).await {
        Ok(()) => true,
        Err(_) => {
            tracing::error!("Aggregator channel closed, failure record dropped");
            false
        }
    }
}
