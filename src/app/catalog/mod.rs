//! Persisted catalog of extracted archives and bookmarks
//!
//! The catalog is the single writer of durable state. It owns two mappings:
//! entry key to [`CatalogEntry`] and source to bookmarked entry key. Every
//! mutation is applied to a copy of the state, the copy is persisted as a
//! whole, and only then does it replace the in-memory state. A mutation whose
//! persistence fails therefore leaves the catalog exactly as it was.
//!
//! # Module Organization
//!
//! - [`types`] - Entry, metadata and document types
//! - [`store`] - Loading and atomic persistence
//!
//! # Examples
//!
//! ```rust,no_run
//! use paper_kiosk::app::catalog::Catalog;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut catalog = Catalog::open("database.json")?;
//! catalog.set_bookmark("haz", "haz_01-06-2024")?;
//! assert_eq!(catalog.bookmark("haz"), Some("haz_01-06-2024"));
//! # Ok(())
//! # }
//! ```

pub mod store;
pub mod types;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::app::naming::ArchiveIdentity;
use crate::errors::{CatalogError, CatalogResult};

pub use types::{ArchiveMetadata, CatalogEntry, CatalogState};

/// Catalog shared between the sync worker and the navigation engine
pub type SharedCatalog = Arc<Mutex<Catalog>>;

/// Acquire the catalog lock
///
/// # Errors
///
/// Returns `CatalogError::LockPoisoned` if a previous holder panicked.
pub fn lock(catalog: &SharedCatalog) -> CatalogResult<MutexGuard<'_, Catalog>> {
    catalog.lock().map_err(|_| CatalogError::LockPoisoned)
}

/// In-memory view of the persisted catalog
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    state: CatalogState,
}

impl Catalog {
    /// Load the catalog from `path`, creating an empty one on first run
    ///
    /// # Errors
    ///
    /// Returns a format error if the file exists but is not well-formed, if
    /// any key is not a valid archive key, or if any entry violates its page
    /// or DPI invariants. Callers should treat this as fatal.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = store::load_or_create(&path)?;
        validate_state(&state)?;

        info!(
            "Opened catalog {} with {} entries",
            path.display(),
            state.newspaper.len()
        );
        Ok(Self { path, state })
    }

    /// Wrap the catalog for sharing between components
    pub fn into_shared(self) -> SharedCatalog {
        Arc::new(Mutex::new(self))
    }

    /// Path of the durable catalog file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an entry
    pub fn entry(&self, key: &str) -> Option<&CatalogEntry> {
        self.state.newspaper.get(key)
    }

    /// Whether an entry exists
    pub fn contains(&self, key: &str) -> bool {
        self.state.newspaper.contains_key(key)
    }

    /// Iterate over all entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.state
            .newspaper
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state.newspaper.len()
    }

    /// Whether the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.state.newspaper.is_empty()
    }

    /// Bookmarked entry key for a source
    pub fn bookmark(&self, source: &str) -> Option<&str> {
        self.state.bookmark.get(source).map(String::as_str)
    }

    /// Iterate over all bookmarks as (source, key)
    pub fn bookmarks(&self) -> impl Iterator<Item = (&str, &str)> {
        self.state
            .bookmark
            .iter()
            .map(|(source, key)| (source.as_str(), key.as_str()))
    }

    /// Candidate keys that are not present as entries
    ///
    /// Duplicates in `candidates` collapse into one key.
    pub fn missing_keys<I, S>(&self, candidates: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .filter(|key| !self.contains(key.as_ref()))
            .map(|key| key.as_ref().to_string())
            .collect()
    }

    /// Newest entry date known for a source
    pub fn newest_date(&self, source: &str) -> Option<NaiveDate> {
        self.state
            .newspaper
            .keys()
            .filter_map(|key| ArchiveIdentity::parse(key).ok())
            .filter(|identity| identity.source == source)
            .map(|identity| identity.date)
            .max()
    }

    /// Insert or replace an entry
    ///
    /// # Errors
    ///
    /// Returns a format error if the key is not a valid archive key or the
    /// entry violates its invariants, or a persistence error.
    pub fn upsert_entry(&mut self, key: &str, entry: CatalogEntry) -> CatalogResult<()> {
        validate_key(key)?;
        entry.validate().map_err(|reason| CatalogError::InvalidEntry {
            key: key.to_string(),
            reason,
        })?;

        self.commit(|state| {
            state.newspaper.insert(key.to_string(), entry);
        })?;
        info!(entry = key, "Catalog entry committed");
        Ok(())
    }

    /// Set the opened page of an entry
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownEntry` if the entry does not exist,
    /// `CatalogError::InvalidEntry` if `page` is outside `1..=page_count`.
    pub fn set_page(&mut self, key: &str, page: u32) -> CatalogResult<()> {
        let entry = self.entry(key).ok_or_else(|| CatalogError::UnknownEntry {
            key: key.to_string(),
        })?;
        if page < 1 || page > entry.page_count {
            return Err(CatalogError::InvalidEntry {
                key: key.to_string(),
                reason: format!("page {} outside 1..={}", page, entry.page_count),
            });
        }
        if entry.page == page {
            return Ok(());
        }

        self.commit(|state| {
            if let Some(entry) = state.newspaper.get_mut(key) {
                entry.page = page;
            }
        })?;
        debug!(entry = key, page, "Page updated");
        Ok(())
    }

    /// Remove an entry, returning it if it existed
    pub fn remove_entry(&mut self, key: &str) -> CatalogResult<Option<CatalogEntry>> {
        let Some(existing) = self.entry(key).cloned() else {
            return Ok(None);
        };

        self.commit(|state| {
            state.newspaper.remove(key);
        })?;
        info!(entry = key, "Catalog entry removed");
        Ok(Some(existing))
    }

    /// Bookmark `key` for `source`, replacing any previous bookmark
    pub fn set_bookmark(&mut self, source: &str, key: &str) -> CatalogResult<()> {
        validate_key(key)?;
        if self.bookmark(source) == Some(key) {
            return Ok(());
        }

        self.commit(|state| {
            state.bookmark.insert(source.to_string(), key.to_string());
        })?;
        info!(source, entry = key, "Bookmark created");
        Ok(())
    }

    /// Remove the bookmark for `source`
    ///
    /// Returns whether a bookmark existed.
    pub fn clear_bookmark(&mut self, source: &str) -> CatalogResult<bool> {
        if self.bookmark(source).is_none() {
            return Ok(false);
        }

        self.commit(|state| {
            state.bookmark.remove(source);
        })?;
        info!(source, "Bookmark removed");
        Ok(true)
    }

    /// Serialize the full catalog and overwrite the durable store
    ///
    /// Mutating operations persist implicitly; this is only needed to
    /// rewrite the file from the in-memory state.
    pub fn persist(&self) -> CatalogResult<()> {
        store::write_atomic(&self.path, &self.state)
    }

    fn commit<F>(&mut self, mutate: F) -> CatalogResult<()>
    where
        F: FnOnce(&mut CatalogState),
    {
        let mut next = self.state.clone();
        mutate(&mut next);
        store::write_atomic(&self.path, &next)?;
        self.state = next;
        Ok(())
    }
}

fn validate_key(key: &str) -> CatalogResult<()> {
    ArchiveIdentity::parse(key)
        .map(|_| ())
        .map_err(|source| CatalogError::InvalidKey {
            key: key.to_string(),
            source,
        })
}

fn validate_state(state: &CatalogState) -> CatalogResult<()> {
    for (key, entry) in &state.newspaper {
        validate_key(key)?;
        entry.validate().map_err(|reason| CatalogError::InvalidEntry {
            key: key.clone(),
            reason,
        })?;
    }
    for key in state.bookmark.values() {
        validate_key(key)?;
    }
    Ok(())
}
