//! Run phase tracking.
//!
//! A run moves strictly forward: `Idle → Dispatching → Draining → Finalized`.
//! Observers subscribe through a watch channel and always see the latest phase.
//! Each transition is a compare-and-set on the channel value, so of two callers
//! racing for the same transition exactly one wins.

use std::fmt;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    /// No run has been started yet.
    Idle,
    /// Host tasks are running and may still send failure records.
    Dispatching,
    /// Every host task has finished; the aggregator is finishing the report.
    Draining,
    /// The report is complete and handed back.
    Finalized,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Draining => "draining",
            RunPhase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid phase transition {from} -> {to}")]
pub struct PhaseError {
    pub from: RunPhase,
    pub to: RunPhase,
}

#[derive(Debug)]
pub struct PhaseTracker {
    tx: watch::Sender<RunPhase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunPhase::Idle);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> RunPhase {
        *self.tx.borrow()
    }

    /// Move to the next phase. Skipping or going backwards is an error.
    pub fn advance(&self, to: RunPhase) -> Result<(), PhaseError> {
        let mut from = to;
        let moved = self.tx.send_if_modified(|phase| {
            from = *phase;
            let allowed = matches!(
                (from, to),
                (RunPhase::Idle, RunPhase::Dispatching)
                    | (RunPhase::Dispatching, RunPhase::Draining)
                    | (RunPhase::Draining, RunPhase::Finalized)
            );
            if allowed {
                *phase = to;
            }
            allowed
        });
        if !moved {
            return Err(PhaseError { from, to });
        }
        tracing::debug!(phase = %to, "Run phase advanced");
        Ok(())
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
