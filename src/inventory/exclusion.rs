//! Host exclusion file.

use std::collections::BTreeSet;
use std::path::Path;

use crate::inventory::InventoryError;
use crate::orchestrator::Host;

/// Parse an exclusion list: one host per line, blank lines ignored.
pub fn parse_exclusions(contents: &str) -> BTreeSet<Host> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Host::from)
        .collect()
}

/// Remove every host listed in `file` from `hosts`.
pub async fn filter_excluded(
    hosts: BTreeSet<Host>,
    file: &Path,
) -> Result<BTreeSet<Host>, InventoryError> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| InventoryError::ExclusionFile {
            path: file.to_path_buf(),
            source,
        })?;
    let excluded = parse_exclusions(&contents);

    let before = hosts.len();
    let remaining: BTreeSet<Host> = hosts.difference(&excluded).cloned().collect();
    tracing::info!(
        excluded = before - remaining.len(),
        remaining = remaining.len(),
        "Applied host exclusion file"
    );
    Ok(remaining)
}
