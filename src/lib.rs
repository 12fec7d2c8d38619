//! Fleet health checkup library.
//!
//! Runs an ordered list of remote diagnostic commands against every host of an
//! inventory, concurrently, and folds the results into one report.

pub mod checks;
pub mod config;
pub mod inventory;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod report;
pub mod transport;

pub use checks::CheckRegistry;
pub use config::schema::CheckupConfig;
pub use orchestrator::{FailureEntry, FailureRecord, Host, Orchestrator, CONNECTION_KIND};
pub use report::Report;
