//! Removal of expired entries

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::app::catalog::{self, SharedCatalog};
use crate::app::naming::ArchiveIdentity;
use crate::errors::SyncResult;

/// Remove entries whose date is more than `keep_days` before `today`
///
/// The entry is dropped from the catalog first, then its page assets below
/// `renderings_dir` are deleted; a failed delete only warns. Bookmarked
/// entries are never removed. Returns the removed keys.
///
/// # Errors
///
/// Returns a catalog error if persisting a removal fails. Entries removed
/// before the failure stay removed.
pub fn prune_entries(
    catalog: &SharedCatalog,
    renderings_dir: &Path,
    today: NaiveDate,
    keep_days: i64,
) -> SyncResult<Vec<String>> {
    let mut catalog = catalog::lock(catalog)?;

    let bookmarked: Vec<String> = catalog
        .bookmarks()
        .map(|(_, key)| key.to_string())
        .collect();
    let expired: Vec<String> = catalog
        .entries()
        .map(|(key, _)| key)
        .filter(|key| !bookmarked.iter().any(|b| b.as_str() == *key))
        .filter(|key| {
            ArchiveIdentity::parse(key)
                .map(|identity| (today - identity.date).num_days() > keep_days)
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect();

    let mut removed = Vec::with_capacity(expired.len());
    for key in expired {
        catalog.remove_entry(&key)?;

        let dir = renderings_dir.join(&key);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!("Failed to remove page assets {}: {}", dir.display(), e);
            }
        }
        debug!(entry = %key, "Pruned entry");
        removed.push(key);
    }

    info!(removed = removed.len(), keep_days, "Prune finished");
    Ok(removed)
}
