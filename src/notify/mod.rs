//! Run summary and its delivery.
//!
//! # Data Flow
//! ```text
//! Finalized Report
//!     → Summary::from_report (host total, connection failures, per-kind tallies)
//!     → Summary::render_markdown
//!     → Notifier (DingTalk robot, or the log when no webhook is set)
//! ```
//!
//! # Design Decisions
//! - The connection kind is counted separately, never in the per-kind list
//! - Every configured kind is listed, including those with zero failures

pub mod dingtalk;

use async_trait::async_trait;
use thiserror::Error;

use crate::orchestrator::CONNECTION_KIND;
use crate::report::Report;

pub use dingtalk::DingTalkNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The webhook answered but refused the message.
    #[error("notification rejected (errcode {code}): {message}")]
    Rejected { code: i64, message: String },
}

/// Headline numbers of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total_hosts: usize,
    pub connection_failures: usize,
    /// Configured kinds in order, with their failure counts.
    pub per_kind: Vec<(String, usize)>,
    pub report_link: Option<String>,
}

impl Summary {
    pub fn from_report(report: &Report, report_link: Option<String>) -> Self {
        let per_kind = report
            .layout()
            .kinds()
            .iter()
            .filter(|kind| kind.as_str() != CONNECTION_KIND)
            .map(|kind| (kind.clone(), report.failure_count(kind)))
            .collect();

        Self {
            total_hosts: report.len(),
            connection_failures: report.failure_count(CONNECTION_KIND),
            per_kind,
            report_link,
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut text = format!(
            "Hosts to check: {}, of which {} failed to connect.\n\n\
             Failures found on reachable hosts:\n\n---\n\n",
            self.total_hosts, self.connection_failures
        );
        for (kind, count) in &self.per_kind {
            text.push_str(&format!("- `{kind}`: {count}\n"));
        }
        text.push_str("\n---\n");
        if let Some(link) = &self.report_link {
            text.push_str(&format!("\nFull report: {link}\n"));
        }
        text
    }
}

/// Delivers the run summary somewhere a human will see it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, summary: &Summary) -> Result<(), NotifyError>;
}

/// Writes the summary to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, summary: &Summary) -> Result<(), NotifyError> {
        tracing::info!(
            title,
            total_hosts = summary.total_hosts,
            connection_failures = summary.connection_failures,
            "\n{}",
            summary.render_markdown()
        );
        Ok(())
    }
}
