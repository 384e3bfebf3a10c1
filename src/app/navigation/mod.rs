//! Entry and page navigation
//!
//! The engine holds a cursor (selected source and date) over the shared
//! catalog. Entry navigation moves the date one day at a time and never
//! goes past today; page navigation moves the persisted page of the current
//! entry within `1..=page_count`.
//!
//! Hitting a bound is an expected outcome, reported as a [`Transition`]
//! value so the presentation layer can show a short notice. Only catalog
//! failures and integrity violations are errors.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use crate::app::catalog::{self, Catalog, SharedCatalog};
use crate::app::clock::SharedClock;
use crate::app::layout::StorageLayout;
use crate::app::naming::ArchiveIdentity;
use crate::constants::naming::LABEL_DATE_FORMAT;
use crate::errors::{NavResult, NavigationError};

/// A bound that stopped a navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The cursor is already at today's date
    Today,
    /// The current entry is open at its first page
    FirstPage,
    /// The current entry is open at its last page
    LastPage,
}

/// Outcome of a navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The cursor or page changed
    Moved,
    /// Nothing changed because a bound was reached
    Boundary(Boundary),
    /// Nothing changed because the current date has no entry
    MissingEntry,
}

impl Transition {
    /// Whether the step changed anything
    pub fn moved(self) -> bool {
        self == Transition::Moved
    }
}

/// Image pair of the currently opened page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImages {
    pub low_res: PathBuf,
    pub high_res: PathBuf,
}

/// Human readable description of the opened page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLabel {
    /// e.g. "HAZ vom 01.06.2024"
    pub entry: String,
    /// e.g. "Seite 3"
    pub page: String,
}

/// Navigation state machine over the catalog
#[derive(Debug)]
pub struct NavigationEngine {
    catalog: SharedCatalog,
    layout: StorageLayout,
    clock: SharedClock,
    source: String,
    date: NaiveDate,
}

impl NavigationEngine {
    /// Create an engine with `source` selected
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the catalog lock is poisoned.
    pub fn new(
        catalog: SharedCatalog,
        layout: StorageLayout,
        clock: SharedClock,
        source: &str,
    ) -> NavResult<Self> {
        let today = clock.today();
        let mut engine = Self {
            catalog,
            layout,
            clock,
            source: source.to_string(),
            date: today,
        };
        engine.select_source(source)?;
        Ok(engine)
    }

    /// Selected source
    pub fn current_source(&self) -> &str {
        &self.source
    }

    /// Date under the cursor
    pub fn current_date(&self) -> NaiveDate {
        self.date
    }

    /// Entry key under the cursor
    pub fn current_key(&self) -> String {
        ArchiveIdentity {
            source: self.source.clone(),
            date: self.date,
        }
        .key()
    }

    /// Select a source and move the cursor to its starting date
    ///
    /// The starting date is the bookmarked entry's date if the source has a
    /// bookmark, otherwise the newest catalogued date for the source, or
    /// today if it has no entries.
    pub fn select_source(&mut self, source: &str) -> NavResult<()> {
        let catalog = catalog::lock(&self.catalog)?;

        let bookmarked = catalog
            .bookmark(source)
            .and_then(|key| ArchiveIdentity::parse(key).ok())
            .map(|identity| identity.date);

        self.date = match bookmarked {
            Some(date) => {
                info!(source, date = %date, "Bookmark applied");
                date
            }
            None => self.newest_date(&catalog, source),
        };
        self.source = source.to_string();

        debug!(source, date = %self.date, "Source selected");
        Ok(())
    }

    /// Move to the next day, unless the cursor is at today
    ///
    /// A cursor past today (an entry dated in the future) is pulled back to
    /// today and reports the boundary.
    pub fn next_entry(&mut self) -> Transition {
        let today = self.clock.today();
        match self.date.checked_add_days(Days::new(1)) {
            Some(next) if next <= today => {
                self.date = next;
                debug!(date = %self.date, "Moved to next entry");
                Transition::Moved
            }
            _ => {
                self.date = self.date.min(today);
                info!(source = %self.source, boundary = "today", "Navigation boundary reached");
                Transition::Boundary(Boundary::Today)
            }
        }
    }

    /// Move to the previous day
    pub fn prev_entry(&mut self) -> Transition {
        if let Some(prev) = self.date.checked_sub_days(Days::new(1)) {
            self.date = prev;
        }
        debug!(date = %self.date, "Moved to previous entry");
        Transition::Moved
    }

    /// Move to the newest entry of the source and drop its bookmark
    pub fn jump_to_newest(&mut self) -> NavResult<()> {
        let mut catalog = catalog::lock(&self.catalog)?;
        self.date = self.newest_date(&catalog, &self.source);
        catalog.clear_bookmark(&self.source)?;

        info!(source = %self.source, date = %self.date, "Jumped to newest entry");
        Ok(())
    }

    /// Bookmark the entry under the cursor
    pub fn create_bookmark(&self) -> NavResult<()> {
        let key = self.current_key();
        catalog::lock(&self.catalog)?.set_bookmark(&self.source, &key)?;
        Ok(())
    }

    /// Remove the bookmark of the current source
    pub fn remove_bookmark(&self) -> NavResult<()> {
        catalog::lock(&self.catalog)?.clear_bookmark(&self.source)?;
        Ok(())
    }

    /// Whether the current source has a bookmark
    pub fn bookmark_is_set(&self) -> NavResult<bool> {
        Ok(catalog::lock(&self.catalog)?
            .bookmark(&self.source)
            .is_some())
    }

    /// Whether the date under the cursor has an entry
    pub fn entry_exists(&self) -> NavResult<bool> {
        Ok(catalog::lock(&self.catalog)?.contains(&self.current_key()))
    }

    /// Open the first page
    pub fn first_page(&self) -> NavResult<Transition> {
        self.turn_page(|_, _| Ok(1))
    }

    /// Open the last page
    pub fn last_page(&self) -> NavResult<Transition> {
        self.turn_page(|_, page_count| Ok(page_count))
    }

    /// Open the next page, unless the last page is open
    pub fn next_page(&self) -> NavResult<Transition> {
        self.turn_page(|page, page_count| {
            if page >= page_count {
                Err(Boundary::LastPage)
            } else {
                Ok(page + 1)
            }
        })
    }

    /// Open the previous page, unless the first page is open
    pub fn prev_page(&self) -> NavResult<Transition> {
        self.turn_page(|page, _| {
            if page <= 1 {
                Err(Boundary::FirstPage)
            } else {
                Ok(page - 1)
            }
        })
    }

    /// Image pair of the opened page
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::NoEntry` if the date has no entry and
    /// `NavigationError::MissingPages` if either image is absent although
    /// the catalog lists the entry.
    pub fn resolve_images(&self) -> NavResult<PageImages> {
        let key = self.current_key();
        let page = {
            let catalog = catalog::lock(&self.catalog)?;
            catalog
                .entry(&key)
                .map(|entry| entry.page)
                .ok_or_else(|| NavigationError::NoEntry { key: key.clone() })?
        };

        let (low_res, high_res) = self.layout.page_images(&key, page);
        for path in [&low_res, &high_res] {
            if !path.is_file() {
                return Err(NavigationError::MissingPages {
                    key,
                    path: path.clone(),
                });
            }
        }

        Ok(PageImages { low_res, high_res })
    }

    /// Ratio of low to high resolution DPI of the current entry
    pub fn dpi_ratio(&self) -> NavResult<f64> {
        let key = self.current_key();
        let catalog = catalog::lock(&self.catalog)?;
        catalog
            .entry(&key)
            .map(|entry| entry.dpi_ratio())
            .ok_or(NavigationError::NoEntry { key })
    }

    /// Labels describing the opened page
    ///
    /// `labels` maps source names to display names. A date without an
    /// entry is labelled as page 1.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownSource` if the current source has
    /// no display name.
    pub fn page_label(&self, labels: &BTreeMap<String, String>) -> NavResult<PageLabel> {
        let display = labels
            .get(&self.source)
            .ok_or_else(|| NavigationError::UnknownSource {
                source_name: self.source.clone(),
            })?;

        let page = catalog::lock(&self.catalog)?
            .entry(&self.current_key())
            .map_or(1, |entry| entry.page);

        Ok(PageLabel {
            entry: format!("{} vom {}", display, self.date.format(LABEL_DATE_FORMAT)),
            page: format!("Seite {}", page),
        })
    }

    fn newest_date(&self, catalog: &Catalog, source: &str) -> NaiveDate {
        catalog
            .newest_date(source)
            .unwrap_or_else(|| self.clock.today())
    }

    fn turn_page<F>(&self, target: F) -> NavResult<Transition>
    where
        F: FnOnce(u32, u32) -> Result<u32, Boundary>,
    {
        let key = self.current_key();
        let mut catalog = catalog::lock(&self.catalog)?;

        let Some(entry) = catalog.entry(&key) else {
            debug!(entry = %key, "No entry for page navigation");
            return Ok(Transition::MissingEntry);
        };

        match target(entry.page, entry.page_count) {
            Ok(page) => {
                catalog.set_page(&key, page)?;
                debug!(entry = %key, page, "Turned page");
                Ok(Transition::Moved)
            }
            Err(boundary) => {
                info!(entry = %key, ?boundary, "Navigation boundary reached");
                Ok(Transition::Boundary(boundary))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalog::CatalogEntry;
    use crate::app::clock::FixedClock;
    use serde_json::Map;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(page_count: u32) -> CatalogEntry {
        CatalogEntry {
            page: 1,
            page_count,
            dpi_low: 50.0,
            dpi_high: 200.0,
            extra: Map::new(),
        }
    }

    struct Setup {
        _temp_dir: TempDir,
        layout: StorageLayout,
        catalog: SharedCatalog,
    }

    fn setup(entries: &[(&str, u32)]) -> Setup {
        let temp_dir = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp_dir.path());
        let mut catalog = Catalog::open(layout.catalog_file()).unwrap();
        for (key, page_count) in entries {
            catalog.upsert_entry(key, entry(*page_count)).unwrap();
        }
        Setup {
            _temp_dir: temp_dir,
            layout,
            catalog: catalog.into_shared(),
        }
    }

    fn engine(setup: &Setup, today: NaiveDate) -> NavigationEngine {
        NavigationEngine::new(
            setup.catalog.clone(),
            setup.layout.clone(),
            Arc::new(FixedClock(today)),
            "haz",
        )
        .unwrap()
    }

    fn page_of(setup: &Setup, key: &str) -> u32 {
        catalog::lock(&setup.catalog).unwrap().entry(key).unwrap().page
    }

    #[test]
    fn test_select_source_prefers_bookmark_then_newest_then_today() {
        let s = setup(&[("haz_30-05-2024", 2), ("haz_31-05-2024", 2), ("np_05-06-2024", 2)]);

        let mut nav = engine(&s, date(2024, 6, 10));
        assert_eq!(nav.current_date(), date(2024, 5, 31));

        catalog::lock(&s.catalog)
            .unwrap()
            .set_bookmark("haz", "haz_30-05-2024")
            .unwrap();
        nav.select_source("haz").unwrap();
        assert_eq!(nav.current_date(), date(2024, 5, 30));

        nav.select_source("other").unwrap();
        assert_eq!(nav.current_source(), "other");
        assert_eq!(nav.current_date(), date(2024, 6, 10));
    }

    #[test]
    fn test_next_entry_stops_at_today() {
        let s = setup(&[("haz_31-05-2024", 1)]);
        let mut nav = engine(&s, date(2024, 6, 1));

        assert_eq!(nav.next_entry(), Transition::Moved);
        assert_eq!(nav.current_date(), date(2024, 6, 1));

        assert_eq!(nav.next_entry(), Transition::Boundary(Boundary::Today));
        assert_eq!(nav.current_date(), date(2024, 6, 1));
    }

    #[test]
    fn test_next_entry_clamps_future_cursor_to_today() {
        let s = setup(&[("haz_03-06-2024", 1)]);
        let mut nav = engine(&s, date(2024, 6, 1));
        assert_eq!(nav.current_date(), date(2024, 6, 3));

        assert_eq!(nav.next_entry(), Transition::Boundary(Boundary::Today));
        assert_eq!(nav.current_date(), date(2024, 6, 1));
    }

    #[test]
    fn test_prev_entry_is_unbounded() {
        let s = setup(&[]);
        let mut nav = engine(&s, date(2024, 6, 1));

        for _ in 0..400 {
            assert!(nav.prev_entry().moved());
        }
        assert_eq!(nav.current_date(), date(2023, 4, 28));
        assert!(!nav.entry_exists().unwrap());
    }

    #[test]
    fn test_page_bounds() {
        let s = setup(&[("haz_01-06-2024", 3)]);
        let nav = engine(&s, date(2024, 6, 1));

        assert_eq!(nav.prev_page().unwrap(), Transition::Boundary(Boundary::FirstPage));
        assert_eq!(page_of(&s, "haz_01-06-2024"), 1);

        assert_eq!(nav.next_page().unwrap(), Transition::Moved);
        assert_eq!(nav.next_page().unwrap(), Transition::Moved);
        assert_eq!(nav.next_page().unwrap(), Transition::Boundary(Boundary::LastPage));
        assert_eq!(page_of(&s, "haz_01-06-2024"), 3);

        assert_eq!(nav.first_page().unwrap(), Transition::Moved);
        assert_eq!(page_of(&s, "haz_01-06-2024"), 1);
        assert_eq!(nav.last_page().unwrap(), Transition::Moved);
        assert_eq!(page_of(&s, "haz_01-06-2024"), 3);
    }

    #[test]
    fn test_page_ops_without_entry() {
        let s = setup(&[("haz_31-05-2024", 3)]);
        let mut nav = engine(&s, date(2024, 6, 1));
        nav.next_entry();
        assert_eq!(nav.current_key(), "haz_01-06-2024");

        assert_eq!(nav.first_page().unwrap(), Transition::MissingEntry);
        assert_eq!(nav.last_page().unwrap(), Transition::MissingEntry);
        assert_eq!(nav.next_page().unwrap(), Transition::MissingEntry);
        assert_eq!(nav.prev_page().unwrap(), Transition::MissingEntry);
        assert!(matches!(nav.dpi_ratio(), Err(NavigationError::NoEntry { .. })));
    }

    #[test]
    fn test_bookmark_toggle_and_jump_to_newest() {
        let s = setup(&[("haz_30-05-2024", 1), ("haz_31-05-2024", 1)]);
        let mut nav = engine(&s, date(2024, 6, 1));
        nav.prev_entry();
        assert_eq!(nav.current_key(), "haz_30-05-2024");

        nav.create_bookmark().unwrap();
        assert!(nav.bookmark_is_set().unwrap());
        nav.remove_bookmark().unwrap();
        assert!(!nav.bookmark_is_set().unwrap());
        nav.create_bookmark().unwrap();
        assert!(nav.bookmark_is_set().unwrap());

        nav.jump_to_newest().unwrap();
        assert_eq!(nav.current_key(), "haz_31-05-2024");
        assert!(!nav.bookmark_is_set().unwrap());
    }

    #[test]
    fn test_resolve_images_and_dpi_ratio() {
        let s = setup(&[("haz_01-06-2024", 2)]);
        let nav = engine(&s, date(2024, 6, 1));
        nav.next_page().unwrap();

        let dir = s.layout.entry_dir("haz_01-06-2024");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("02_lo.png"), b"lo").unwrap();

        let err = nav.resolve_images().unwrap_err();
        assert!(matches!(err, NavigationError::MissingPages { ref path, .. } if path.ends_with("02_hi.png")));

        fs::write(dir.join("02_hi.png"), b"hi").unwrap();
        let images = nav.resolve_images().unwrap();
        assert_eq!(images.low_res, dir.join("02_lo.png"));
        assert_eq!(images.high_res, dir.join("02_hi.png"));
        assert_eq!(nav.dpi_ratio().unwrap(), 0.25);
    }

    #[test]
    fn test_page_label() {
        let s = setup(&[("haz_01-06-2024", 4)]);
        let nav = engine(&s, date(2024, 6, 1));
        nav.last_page().unwrap();

        let labels: BTreeMap<String, String> =
            [("haz".to_string(), "HAZ".to_string())].into_iter().collect();
        let label = nav.page_label(&labels).unwrap();
        assert_eq!(label.entry, "HAZ vom 01.06.2024");
        assert_eq!(label.page, "Seite 4");

        let err = nav.page_label(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, NavigationError::UnknownSource { .. }));
    }
}
