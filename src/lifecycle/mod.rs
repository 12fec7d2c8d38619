//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Registry → Credentials → Inventory → Exclusions
//!     → Transport + Sink → Orchestrator::run → Notifier
//!
//! Phases (phase.rs):
//!     Dispatching → Draining → Finalized
//! ```
//!
//! # Design Decisions
//! - Ordered startup: everything that can fail on bad input fails before dispatch
//! - A run ends on its own; there is no signal-driven shutdown
//! - Report and notification failures surface only after the report exists

pub mod phase;
pub mod startup;
