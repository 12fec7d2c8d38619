//! Data exchanged between host tasks and the aggregator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::phase::PhaseError;

/// Kind used for connection establishment failures.
///
/// Occupies its own report column and is never a valid check kind.
pub const CONNECTION_KIND: &str = "connection";

/// A target machine, identified by its address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for Host {
    fn from(addr: String) -> Self {
        Self(addr)
    }
}

/// One failed check (or the failed connection) on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub kind: String,
    pub message: String,
}

impl FailureEntry {
    /// Entry for a connection that could not be established.
    pub fn connection(host: &Host, detail: impl fmt::Display) -> Self {
        Self {
            kind: CONNECTION_KIND.to_string(),
            message: format!("{host} connection failed, {detail}"),
        }
    }

    /// Entry for a check that failed to execute, parse, or pass its threshold.
    pub fn check(host: &Host, kind: &str, command: &str, detail: impl fmt::Display) -> Self {
        Self {
            kind: kind.to_string(),
            message: format!(
                "{host} {kind} checkup exception, failed to execute command {command}: {detail}"
            ),
        }
    }
}

/// Everything that went wrong on one host. A host task sends at most one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub host: Host,
    pub entries: Vec<FailureEntry>,
    /// Check kinds skipped because the pipeline aborted before reaching them.
    pub not_attempted: Vec<String>,
}

impl FailureRecord {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.not_attempted.is_empty()
    }
}

/// Errors that break the completion handshake itself.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The aggregator dropped its done channel without finalizing.
    #[error("aggregator exited before signalling completion")]
    AggregatorLost,

    #[error("aggregator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}
