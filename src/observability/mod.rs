//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one `host` span per host task)
//!     → metrics.rs (counters and gauges for hosts, connections, checks)
//!
//! Consumers:
//!     → stdout (pretty for operators, JSON for log shipping)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging through `tracing`; every event carries the host in scope
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed
//! - The run id is attached as a span field, not threaded through call signatures

pub mod logging;
pub mod metrics;
