//! Target host discovery.
//!
//! # Data Flow
//! ```text
//! InventoryConfig
//!     → Inventory::list_target_hosts (static list or Zabbix template)
//!     → filter_excluded (optional exclusion file)
//!     → BTreeSet<Host>, consumed once by the dispatcher
//! ```
//!
//! # Design Decisions
//! - The target set is a `BTreeSet`: duplicate-free and deterministically ordered
//! - Any inventory failure is fatal before a single host task starts

pub mod exclusion;
pub mod static_list;
pub mod zabbix;

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::InventoryConfig;
use crate::orchestrator::Host;

pub use exclusion::filter_excluded;
pub use static_list::StaticInventory;
pub use zabbix::ZabbixInventory;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The JSON-RPC call returned an error object.
    #[error("{method} failed ({code}): {message}")]
    Api {
        method: String,
        code: i64,
        message: String,
    },

    #[error("unexpected {method} response: {detail}")]
    Response { method: String, detail: String },

    #[error("template `{0}` not found")]
    TemplateNotFound(String),

    #[error("failed to read exclusion file {path}: {source}")]
    ExclusionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A source of target hosts.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn list_target_hosts(&self) -> Result<BTreeSet<Host>, InventoryError>;
}

/// Build the inventory named by the configuration.
pub fn from_config(config: &InventoryConfig) -> Result<Box<dyn Inventory>, InventoryError> {
    Ok(match config {
        InventoryConfig::Static { hosts } => Box::new(StaticInventory::new(hosts.iter().map(String::as_str))),
        InventoryConfig::Zabbix(zabbix) => Box::new(ZabbixInventory::new(zabbix.clone())?),
    })
}
