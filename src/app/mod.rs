//! Core engine for Paper Kiosk
//!
//! This module contains the archive synchronization pipeline (remote index,
//! download, decryption and extraction), the persisted catalog, and the
//! navigation state machine the reader UI drives.
//!
//! # Examples
//!
//! ```rust,no_run
//! use paper_kiosk::app::{system_clock, Catalog, NavigationEngine, StorageLayout};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = StorageLayout::new("/var/lib/paper-kiosk");
//! let catalog = Catalog::open(layout.catalog_file())?.into_shared();
//!
//! let mut nav = NavigationEngine::new(catalog, layout, system_clock(), "haz")?;
//! if nav.entry_exists()? {
//!     let images = nav.resolve_images()?;
//!     println!("Showing {}", images.low_res.display());
//! }
//! nav.prev_entry();
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod catalog;
pub mod client;
pub mod clock;
pub mod coordinator;
pub mod extract;
pub mod layout;
pub mod naming;
pub mod navigation;
pub mod progress;

// Re-export main public API
pub use cancel::CancellationFlag;
pub use catalog::{ArchiveMetadata, Catalog, CatalogEntry, CatalogState, SharedCatalog};
pub use client::{ArchiveClient, ClientConfig, RemoteListing};
pub use clock::{system_clock, Clock, FixedClock, SharedClock, SystemClock};
pub use coordinator::{
    prune_entries, CoordinatorConfig, SignalHandler, SyncCoordinator, SyncEvent, SyncPlan,
    SyncReport,
};
pub use extract::{derive_archive_password, SecureExtractor};
pub use layout::StorageLayout;
pub use naming::ArchiveIdentity;
pub use navigation::{Boundary, NavigationEngine, PageImages, PageLabel, Transition};
