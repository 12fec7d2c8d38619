//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks against the check registry)
//!     → CheckupConfig (validated, immutable)
//!     → shared read-only with every host task
//! ```
//!
//! # Design Decisions
//! - Config is loaded once per run; there is no reload
//! - All sections have defaults so a minimal file only lists checks and credentials
//! - Every validation error is fatal and reported before any host is contacted

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthKind, CheckConfig, CheckupConfig, CredentialConfig, DispatchConfig, InventoryConfig,
    ThresholdConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
