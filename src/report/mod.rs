//! Consolidated per-host outcome table.
//!
//! # Data Flow
//! ```text
//! Aggregator
//!     → Report::record_failure (one per FailureRecord, arrival order)
//!     → Report::record_pass    (every unseen target host, on channel close)
//!     → sink.rs (CSV file, optional scp upload)
//! ```
//!
//! # Design Decisions
//! - Columns are fixed up front: host, connection, then check kinds in configured order
//! - Skipped work is never shown as a pass: excluded and not-attempted cells have their own markers
//! - Counters count failure entries per kind, connection included

pub mod sink;
pub mod upload;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::CheckConfig;
use crate::orchestrator::{FailureRecord, Host, CONNECTION_KIND};

pub use sink::{CsvReportSink, ReportLocation, ReportSink, SinkError};

/// Cell text for a passed check or connection.
pub const PASS_MARKER: &str = "yes";
/// Cell text for a check skipped after its host's connection failed.
pub const NOT_ATTEMPTED_MARKER: &str = "not attempted";
/// Cell text for a check the host is excluded from.
pub const EXCLUDED_MARKER: &str = "excluded";

/// Outcome of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Failed(String),
    NotAttempted,
    Excluded,
}

impl Outcome {
    pub fn as_cell(&self) -> &str {
        match self {
            Outcome::Pass => PASS_MARKER,
            Outcome::Failed(message) => message,
            Outcome::NotAttempted => NOT_ATTEMPTED_MARKER,
            Outcome::Excluded => EXCLUDED_MARKER,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Column order and per-check exclusions, fixed for the whole run.
#[derive(Debug, Clone, Default)]
pub struct ReportLayout {
    kinds: Vec<String>,
    exclusions: HashMap<String, HashSet<Host>>,
}

impl ReportLayout {
    pub fn from_checks(checks: &[CheckConfig]) -> Self {
        let kinds = checks.iter().map(|c| c.kind.clone()).collect();
        let exclusions = checks
            .iter()
            .map(|c| {
                let hosts = c.excluded_hosts.iter().map(|h| Host::new(h.as_str())).collect();
                (c.kind.clone(), hosts)
            })
            .collect();
        Self { kinds, exclusions }
    }

    /// Check kinds in configured order.
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    /// Header row: `host`, `connection`, then each kind.
    pub fn header(&self) -> Vec<&str> {
        let mut header = vec!["host", CONNECTION_KIND];
        header.extend(self.kinds.iter().map(String::as_str));
        header
    }

    fn position(&self, kind: &str) -> Option<usize> {
        self.kinds.iter().position(|k| k == kind)
    }

    fn is_excluded(&self, kind: &str, host: &Host) -> bool {
        self.exclusions
            .get(kind)
            .is_some_and(|hosts| hosts.contains(host))
    }

    /// A row where everything the host is subject to passed.
    fn passing_row(&self, host: Host) -> HostRow {
        let checks = self
            .kinds
            .iter()
            .map(|kind| {
                if self.is_excluded(kind, &host) {
                    Outcome::Excluded
                } else {
                    Outcome::Pass
                }
            })
            .collect();
        HostRow {
            host,
            connection: Outcome::Pass,
            checks,
        }
    }
}

/// One host's line in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRow {
    pub host: Host,
    pub connection: Outcome,
    /// One outcome per kind, in layout order.
    pub checks: Vec<Outcome>,
}

impl HostRow {
    pub fn cells(&self) -> Vec<&str> {
        let mut cells = vec![self.host.as_str(), self.connection.as_cell()];
        cells.extend(self.checks.iter().map(Outcome::as_cell));
        cells
    }
}

/// The run's result table. Owned and mutated by the aggregator only.
#[derive(Debug, Clone, Default)]
pub struct Report {
    layout: ReportLayout,
    rows: Vec<HostRow>,
    index: HashMap<Host, usize>,
    counters: BTreeMap<String, usize>,
}

impl Report {
    pub fn new(layout: ReportLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// Fold one host's failures into its row.
    pub fn record_failure(&mut self, record: FailureRecord) {
        let FailureRecord {
            host,
            entries,
            not_attempted,
        } = record;
        let row_idx = self.row_index(host);

        for kind in not_attempted {
            if let Some(pos) = self.layout.position(&kind) {
                let cell = &mut self.rows[row_idx].checks[pos];
                if *cell == Outcome::Pass {
                    *cell = Outcome::NotAttempted;
                }
            }
        }

        for entry in entries {
            *self.counters.entry(entry.kind.clone()).or_insert(0) += 1;

            let row = &mut self.rows[row_idx];
            if entry.kind == CONNECTION_KIND {
                row.connection = Outcome::Failed(entry.message);
            } else if let Some(pos) = self.layout.position(&entry.kind) {
                row.checks[pos] = Outcome::Failed(entry.message);
            } else {
                tracing::warn!(host = %row.host, kind = %entry.kind, "Failure for unconfigured check kind");
            }
        }
    }

    /// Add an all-pass row unless the host already has one.
    pub fn record_pass(&mut self, host: Host) {
        self.row_index(host);
    }

    fn row_index(&mut self, host: Host) -> usize {
        if let Some(&idx) = self.index.get(&host) {
            return idx;
        }
        let idx = self.rows.len();
        self.index.insert(host.clone(), idx);
        self.rows.push(self.layout.passing_row(host));
        idx
    }

    pub fn rows(&self) -> &[HostRow] {
        &self.rows
    }

    pub fn row(&self, host: &Host) -> Option<&HostRow> {
        self.index.get(host).map(|&idx| &self.rows[idx])
    }

    /// Outcome for `kind` (or the connection) on `host`.
    pub fn outcome(&self, host: &Host, kind: &str) -> Option<&Outcome> {
        let row = self.row(host)?;
        if kind == CONNECTION_KIND {
            return Some(&row.connection);
        }
        self.layout.position(kind).map(|pos| &row.checks[pos])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of failure entries recorded for `kind`.
    pub fn failure_count(&self, kind: &str) -> usize {
        self.counters.get(kind).copied().unwrap_or(0)
    }
}
