//! Check subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ThresholdConfig
//!     → CheckRegistry::builtin (ntp, ulimit, dns, zabbix_agent)
//!     → frozen, shared via Arc with every host pipeline
//!
//! Per check:
//!     raw command output
//!     → CheckRegistry::evaluate(kind, output)
//!     → CheckOutcome::Pass | CheckOutcome::Fail(message) | EvaluationError
//! ```
//!
//! # Design Decisions
//! - A check is a plain function of the command's stdout; it never touches the transport
//! - Malformed output is an error value, never a panic
//! - A panicking check is contained by the registry and reported as a fault

pub mod dns;
pub mod ntp;
pub mod registry;
pub mod ulimit;
pub mod zabbix_agent;

use thiserror::Error;

pub use registry::{CheckFn, CheckRegistry};

/// Result of evaluating one check's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    /// The output parsed but violates the check's rule.
    Fail(String),
}

/// Why a check could not reach a verdict.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Output did not have the expected shape.
    #[error("unexpected output: {0}")]
    Format(String),

    #[error("invalid number {value:?}: {reason}")]
    Number { value: String, reason: String },

    /// The check function panicked.
    #[error("check panicked: {0}")]
    Fault(String),

    #[error("no check registered for kind `{0}`")]
    UnknownKind(String),
}

/// Parse a trimmed integer, the common shape of count-style checks.
pub(crate) fn parse_count(output: &str) -> Result<u64, EvaluationError> {
    let value = output.trim();
    value.parse::<u64>().map_err(|e| EvaluationError::Number {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
