//! Run orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator::run(targets)
//!     ├─ spawn ResultAggregator (aggregator.rs) ◀── bounded mpsc ──┐
//!     └─ HostDispatcher::dispatch (dispatcher.rs)                   │
//!            └─ one task per host                                   │
//!                 run_pipeline (pipeline.rs)                        │
//!                   → ConnectionBroker (broker.rs) → Transport      │
//!                   → CheckRegistry::evaluate                       │
//!                   → at most one FailureRecord ────────────────────┘
//!
//! Completion:
//!     join every host task → drop last sender → await oneshot from aggregator
//! ```
//!
//! # Design Decisions
//! - Host tasks never touch the report; they only send records
//! - Idle, Dispatching, Draining and Finalized are explicit phases, observable via watch
//! - Leaving Idle is a compare-and-set, so overlapping calls to `run` have one winner
//! - A missing done signal is an error, never a silent empty report

pub mod aggregator;
pub mod broker;
pub mod dispatcher;
pub mod pipeline;
pub mod types;

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::lifecycle::phase::{PhaseTracker, RunPhase};
use crate::report::{ReportLayout, ReportSink};

pub use aggregator::{Finalized, ResultAggregator};
pub use broker::ConnectionBroker;
pub use dispatcher::{DispatchSummary, HostDispatcher};
pub use pipeline::{run_pipeline, PipelineContext};
pub use types::{FailureEntry, FailureRecord, Host, OrchestratorError, CONNECTION_KIND};

/// Drives one complete run: fan-out, fan-in, finalize.
pub struct Orchestrator {
    ctx: PipelineContext,
    sink: Arc<dyn ReportSink>,
    channel_capacity: usize,
    max_concurrent_hosts: usize,
    phase: PhaseTracker,
}

/// Result of a finished run.
#[derive(Debug)]
pub struct RunOutcome {
    pub finalized: Finalized,
    pub dispatch: DispatchSummary,
}

impl Orchestrator {
    pub fn new(
        ctx: PipelineContext,
        sink: Arc<dyn ReportSink>,
        channel_capacity: usize,
        max_concurrent_hosts: usize,
    ) -> Self {
        Self {
            ctx,
            sink,
            channel_capacity: channel_capacity.max(1),
            max_concurrent_hosts,
            phase: PhaseTracker::new(),
        }
    }

    pub fn phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// Check every host in `targets` and return the finalized report.
    ///
    /// An orchestrator runs once. The first caller claims the run; any other
    /// call, concurrent or later, fails without contacting a host.
    pub async fn run(&self, targets: BTreeSet<Host>) -> Result<RunOutcome, OrchestratorError> {
        self.phase.advance(RunPhase::Dispatching)?;

        let targets = Arc::new(targets);
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let (done_tx, done_rx) = oneshot::channel();

        let aggregator = ResultAggregator::new(
            targets.clone(),
            ReportLayout::from_checks(&self.ctx.checks),
            self.sink.clone(),
        );
        let aggregator_handle = tokio::spawn(aggregator.run(rx, done_tx));

        let dispatcher = HostDispatcher::new(self.ctx.clone(), self.max_concurrent_hosts);
        let dispatch = dispatcher.dispatch(&targets, tx).await;
        self.phase.advance(RunPhase::Draining)?;

        let finalized = done_rx.await.map_err(|_| OrchestratorError::AggregatorLost);
        aggregator_handle.await?;
        let finalized = finalized?;
        self.phase.advance(RunPhase::Finalized)?;

        Ok(RunOutcome { finalized, dispatch })
    }
}
