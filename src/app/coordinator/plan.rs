//! Sync planning
//!
//! Turns the remote listing into the ordered list of archives to fetch:
//! names that parse, are not yet catalogued and fall inside the retention
//! window.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::app::catalog::Catalog;
use crate::app::client::RemoteListing;
use crate::app::naming::ArchiveIdentity;

/// Archives selected for download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Archives to process, in listing order
    pub items: Vec<ArchiveIdentity>,
    /// Remote names that could not be parsed
    pub rejected: Vec<String>,
}

impl SyncPlan {
    /// Number of archives to process
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to download
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Compute the archives to download
///
/// An archive is kept when it is not already a catalog entry and
/// `today - date <= retention_days`. Listing order is preserved and names
/// resolving to the same key are collapsed.
pub fn plan(
    listing: &RemoteListing,
    catalog: &Catalog,
    retention_days: i64,
    today: NaiveDate,
) -> SyncPlan {
    let mut sync_plan = SyncPlan::default();
    let mut parsed = Vec::with_capacity(listing.len());

    for name in listing.iter() {
        match ArchiveIdentity::parse(name) {
            Ok(identity) => parsed.push(identity),
            Err(e) => {
                warn!("Ignoring remote archive '{}': {}", name, e);
                sync_plan.rejected.push(name.to_string());
            }
        }
    }

    let missing = catalog.missing_keys(parsed.iter().map(ArchiveIdentity::key));
    let mut seen = HashSet::new();

    for identity in parsed {
        let key = identity.key();
        if !missing.contains(&key) || !seen.insert(key) {
            continue;
        }

        let age = (today - identity.date).num_days();
        if age > retention_days {
            debug!(archive = %identity, age, "Outside retention window");
            continue;
        }
        sync_plan.items.push(identity);
    }

    info!(
        planned = sync_plan.items.len(),
        rejected = sync_plan.rejected.len(),
        listed = listing.len(),
        "Sync plan computed"
    );
    sync_plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalog::CatalogEntry;
    use serde_json::Map;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry() -> CatalogEntry {
        CatalogEntry {
            page: 1,
            page_count: 2,
            dpi_low: 50.0,
            dpi_high: 200.0,
            extra: Map::new(),
        }
    }

    fn keys(plan: &SyncPlan) -> Vec<String> {
        plan.items.iter().map(ArchiveIdentity::key).collect()
    }

    #[test]
    fn test_plan_filters_catalogued_and_old_archives() {
        let temp_dir = TempDir::new().unwrap();
        let mut catalog = Catalog::open(temp_dir.path().join("database.json")).unwrap();
        catalog.upsert_entry("haz_31-05-2024", entry()).unwrap();

        let listing = RemoteListing::new([
            "haz_01-06-2024.zip",
            "haz_31-05-2024.zip",
            "haz_30-05-2024.zip",
            "np_02-06-2024.zip",
        ]);
        let sync_plan = plan(&listing, &catalog, 1, date(2024, 6, 1));

        assert_eq!(keys(&sync_plan), ["haz_01-06-2024", "np_02-06-2024"]);
        assert!(sync_plan.rejected.is_empty());
    }

    #[test]
    fn test_plan_records_rejected_names_and_collapses_keys() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Catalog::open(temp_dir.path().join("database.json")).unwrap();

        let listing = RemoteListing::new([
            "haz_01-06-2024.zip",
            "readme.txt",
            "haz_01-06-2024",
            "haz_1-6-2024.zip",
        ]);
        let sync_plan = plan(&listing, &catalog, 1, date(2024, 6, 1));

        assert_eq!(keys(&sync_plan), ["haz_01-06-2024"]);
        assert_eq!(sync_plan.rejected, ["readme.txt", "haz_1-6-2024.zip"]);
    }

    #[test]
    fn test_retention_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Catalog::open(temp_dir.path().join("database.json")).unwrap();
        let listing = RemoteListing::new(["haz_25-05-2024.zip", "haz_24-05-2024.zip"]);

        let sync_plan = plan(&listing, &catalog, 7, date(2024, 6, 1));
        assert_eq!(keys(&sync_plan), ["haz_25-05-2024"]);

        let sync_plan = plan(&listing, &catalog, 0, date(2024, 6, 1));
        assert!(sync_plan.is_empty());
    }
}
