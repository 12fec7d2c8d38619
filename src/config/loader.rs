//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::checks::CheckRegistry;
use crate::config::schema::CheckupConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Check kinds are validated against the built-in registry.
pub fn load_config(path: &Path) -> Result<CheckupConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<CheckupConfig, ConfigError> {
    let config: CheckupConfig = toml::from_str(content)?;

    let registry = CheckRegistry::builtin(&config.thresholds);
    validate_config(&config, &registry).map_err(ConfigError::Validation)?;

    Ok(config)
}
