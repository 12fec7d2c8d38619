//! Inventory from a host list in the configuration.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::inventory::{Inventory, InventoryError};
use crate::orchestrator::Host;

#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    hosts: BTreeSet<Host>,
}

impl StaticInventory {
    /// Blank entries are dropped and surrounding whitespace trimmed.
    pub fn new<'a>(hosts: impl IntoIterator<Item = &'a str>) -> Self {
        let hosts = hosts
            .into_iter()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(Host::from)
            .collect();
        Self { hosts }
    }
}

#[async_trait]
impl Inventory for StaticInventory {
    async fn list_target_hosts(&self) -> Result<BTreeSet<Host>, InventoryError> {
        Ok(self.hosts.clone())
    }
}
