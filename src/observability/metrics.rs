//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define checkup metrics (hosts, connections, check outcomes)
//! - Expose a Prometheus-compatible endpoint when enabled
//!
//! # Metrics
//! - `checkup_hosts_total` (gauge): target hosts in the current run
//! - `checkup_connections_total` (counter): connection attempts by outcome
//! - `checkup_checks_total` (counter): evaluated checks by kind, outcome
//! - `checkup_failure_records_total` (counter): records received by the aggregator
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests need no setup
//! - Labels stay low-cardinality: kind and outcome, never host

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape listener and install it as the global recorder.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_hosts(count: usize) {
    metrics::gauge!("checkup_hosts_total").set(count as f64);
}

pub fn record_connection(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("checkup_connections_total", "outcome" => outcome).increment(1);
}

/// `outcome` is one of `pass`, `fail`, `error`, `excluded`, `not_attempted`.
pub fn record_check(kind: &str, outcome: &'static str) {
    metrics::counter!(
        "checkup_checks_total",
        "kind" => kind.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_failure_record() {
    metrics::counter!("checkup_failure_records_total").increment(1);
}
