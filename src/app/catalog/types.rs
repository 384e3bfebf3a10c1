//! Catalog data types
//!
//! The persisted document has two top-level mappings, `bookmark`
//! (source -> entry key) and `newspaper` (entry key -> entry metadata).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata of one extracted archive plus the reader's page cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Currently opened page (1-based)
    pub page: u32,
    /// Number of pages in the archive
    pub page_count: u32,
    /// Resolution of the low resolution renderings
    pub dpi_low: f64,
    /// Resolution of the high resolution renderings
    pub dpi_high: f64,
    /// Any other archive-supplied metadata, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    /// Build a fresh entry opened at the first page
    pub fn from_metadata(metadata: ArchiveMetadata) -> Self {
        let ArchiveMetadata {
            page_count,
            dpi_low,
            dpi_high,
            mut extra,
        } = metadata;

        // `page` is owned by the catalog, never by the archive
        extra.remove("page");

        Self {
            page: 1,
            page_count,
            dpi_low,
            dpi_high,
            extra,
        }
    }

    /// Check the page and DPI invariants
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_count < 1 {
            return Err(format!("page_count must be at least 1, got {}", self.page_count));
        }
        if self.page < 1 || self.page > self.page_count {
            return Err(format!(
                "page {} outside 1..={}",
                self.page, self.page_count
            ));
        }
        if !(self.dpi_low.is_finite() && self.dpi_low > 0.0) {
            return Err(format!("dpi_low must be positive, got {}", self.dpi_low));
        }
        if !(self.dpi_high.is_finite() && self.dpi_high > 0.0) {
            return Err(format!("dpi_high must be positive, got {}", self.dpi_high));
        }
        Ok(())
    }

    /// Ratio between the low and high resolution renderings
    pub fn dpi_ratio(&self) -> f64 {
        self.dpi_low / self.dpi_high
    }
}

/// Contents of the metadata file shipped inside every archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Number of pages
    pub page_count: u32,
    /// Low resolution DPI
    pub dpi_low: f64,
    /// High resolution DPI
    pub dpi_high: f64,
    /// Additional fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The complete persisted catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    /// Bookmarked entry key per source
    pub bookmark: BTreeMap<String, String>,
    /// Known entries by key
    pub newspaper: BTreeMap<String, CatalogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(json: &str) -> ArchiveMetadata {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_entry_from_metadata_preserves_extra_fields() {
        let meta = metadata(
            r#"{"page_count": 32, "dpi_low": 50, "dpi_high": 200.0, "edition": "Stadt", "page": 7}"#,
        );
        let entry = CatalogEntry::from_metadata(meta);

        assert_eq!(entry.page, 1);
        assert_eq!(entry.page_count, 32);
        assert_eq!(entry.dpi_ratio(), 0.25);
        assert_eq!(entry.extra.get("edition"), Some(&Value::from("Stadt")));
        assert!(!entry.extra.contains_key("page"));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["page"], 1);
        assert_eq!(json["edition"], "Stadt");
    }

    #[test]
    fn test_metadata_requires_fields() {
        let result: Result<ArchiveMetadata, _> =
            serde_json::from_str(r#"{"page_count": 3, "dpi_low": 50}"#);
        assert!(result.is_err());

        let result: Result<ArchiveMetadata, _> =
            serde_json::from_str(r#"{"page_count": -1, "dpi_low": 50, "dpi_high": 100}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invariants() {
        let mut entry = CatalogEntry::from_metadata(metadata(
            r#"{"page_count": 4, "dpi_low": 50, "dpi_high": 100}"#,
        ));
        assert!(entry.validate().is_ok());

        entry.page = 5;
        assert!(entry.validate().is_err());

        entry.page = 0;
        assert!(entry.validate().is_err());

        entry.page = 4;
        entry.dpi_high = 0.0;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_state_requires_both_mappings() {
        let result: Result<CatalogState, _> = serde_json::from_str(r#"{"bookmark": {}}"#);
        assert!(result.is_err());

        let state: CatalogState =
            serde_json::from_str(r#"{"bookmark": {}, "newspaper": {}}"#).unwrap();
        assert_eq!(state, CatalogState::default());
    }
}
