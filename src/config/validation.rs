//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (checks reference registered kinds and known identities)
//! - Decode credential material up front
//! - Validate URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the config and the check registry
//! - Runs before any host task starts; failures end the run

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::checks::{self, CheckRegistry};
use crate::config::schema::{CheckupConfig, InventoryConfig};
use crate::orchestrator::CONNECTION_KIND;
use crate::transport::credential::{Credential, CredentialError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("check kind `{0}` is not registered")]
    UnknownCheckKind(String),

    #[error("check kind `{0}` is configured more than once")]
    DuplicateCheckKind(String),

    #[error("check kind `connection` is reserved")]
    ReservedCheckKind,

    #[error("check `{kind}` uses identity `{identity}` which has no credential")]
    MissingCredential { kind: String, identity: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("dispatch.failure_channel_capacity must be greater than 0")]
    ZeroChannelCapacity,

    #[error("the dns check requires thresholds.dns_nameservers")]
    MissingNameservers,
}

/// Validate a parsed configuration against the registry it will run with.
pub fn validate_config(
    config: &CheckupConfig,
    registry: &CheckRegistry,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for check in &config.checks {
        if check.kind == CONNECTION_KIND {
            errors.push(ValidationError::ReservedCheckKind);
        } else if !registry.contains(&check.kind) {
            errors.push(ValidationError::UnknownCheckKind(check.kind.clone()));
        }
        if !seen.insert(check.kind.as_str()) {
            errors.push(ValidationError::DuplicateCheckKind(check.kind.clone()));
        }
        if !config.credentials.contains_key(&check.identity) {
            errors.push(ValidationError::MissingCredential {
                kind: check.kind.clone(),
                identity: check.identity.clone(),
            });
        }
    }

    for (identity, credential) in &config.credentials {
        if let Err(e) = Credential::from_config(identity, credential) {
            errors.push(e.into());
        }
    }

    if config.checks.iter().any(|c| c.kind == checks::dns::KIND)
        && config.thresholds.dns_nameservers.is_empty()
    {
        errors.push(ValidationError::MissingNameservers);
    }

    if let InventoryConfig::Zabbix(zabbix) = &config.inventory {
        check_url(&mut errors, "inventory.url", &zabbix.url);
    }
    if let Some(webhook) = &config.notification.dingtalk_webhook {
        check_url(&mut errors, "notification.dingtalk_webhook", webhook);
    }
    if let Some(public_url) = &config.report.public_url {
        check_url(&mut errors, "report.public_url", public_url);
    }

    if config.dispatch.failure_channel_capacity == 0 {
        errors.push(ValidationError::ZeroChannelCapacity);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if url::Url::parse(value).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
