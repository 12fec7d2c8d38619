//! Single consumer of failure records.
//!
//! # Responsibilities
//! - Fold each FailureRecord into the report as it arrives
//! - On channel close, add all-pass rows for every host never heard from
//! - Write the report, compute the summary, and hand both back exactly once
//!
//! # Design Decisions
//! - The report is owned by this task alone; nothing else mutates it
//! - Channel closure is the only end-of-input signal
//! - A sink failure is carried in the result; the in-memory report is never lost

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::notify::Summary;
use crate::observability::metrics;
use crate::orchestrator::{FailureRecord, Host};
use crate::report::{Report, ReportLocation, ReportLayout, ReportSink, SinkError};

/// What the aggregator hands back when the run is complete.
#[derive(Debug)]
pub struct Finalized {
    pub report: Report,
    pub summary: Summary,
    pub location: Result<ReportLocation, SinkError>,
}

pub struct ResultAggregator {
    targets: Arc<BTreeSet<Host>>,
    layout: ReportLayout,
    sink: Arc<dyn ReportSink>,
}

impl ResultAggregator {
    pub fn new(targets: Arc<BTreeSet<Host>>, layout: ReportLayout, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            targets,
            layout,
            sink,
        }
    }

    /// Consume records until every sender is gone, then finalize and signal `done`.
    pub async fn run(self, mut rx: mpsc::Receiver<FailureRecord>, done: oneshot::Sender<Finalized>) {
        let mut report = Report::new(self.layout);
        let mut seen: HashSet<Host> = HashSet::new();

        while let Some(record) = rx.recv().await {
            metrics::record_failure_record();
            tracing::debug!(host = %record.host, entries = record.entries.len(), "Failure record received");
            if !seen.insert(record.host.clone()) {
                tracing::warn!(host = %record.host, "Second failure record for host, merging");
            }
            report.record_failure(record);
        }

        tracing::debug!(failing_hosts = seen.len(), "Failure channel closed");

        for host in self.targets.iter().filter(|h| !seen.contains(*h)) {
            report.record_pass(host.clone());
        }

        let location = self.sink.write(&report).await;
        let link = match &location {
            Ok(location) => Some(location.display_target()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to deliver report");
                None
            }
        };
        let summary = Summary::from_report(&report, link);

        tracing::info!(
            hosts = summary.total_hosts,
            connection_failures = summary.connection_failures,
            "Report finalized"
        );

        if done
            .send(Finalized {
                report,
                summary,
                location,
            })
            .is_err()
        {
            tracing::error!("Coordinator stopped waiting for the report");
        }
    }
}
