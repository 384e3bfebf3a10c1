//! Prelude module for Paper Kiosk
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use paper_kiosk::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use paper_kiosk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let (layout, client_config, coordinator_config) = config.to_runtime_config();
//!     let credentials = Credentials::resolve(
//!         config.server.host.as_deref(),
//!         config.server.archive_key.as_deref(),
//!     )?;
//!
//!     let catalog = Catalog::open(layout.catalog_file())?.into_shared();
//!     let client = ArchiveClient::new(credentials.host(), &client_config, layout.downloads_dir())?;
//!     let extractor = SecureExtractor::new(credentials.archive_key(), layout.renderings_dir());
//!     let coordinator =
//!         SyncCoordinator::new(coordinator_config, client, extractor, catalog, system_clock());
//!
//!     let (events, _rx) = tokio::sync::mpsc::unbounded_channel();
//!     coordinator.sync_recent(&events, &CancellationFlag::new()).await?;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, ErrorKind, Result};

// Engine components
pub use crate::app::{
    system_clock, ArchiveClient, ArchiveIdentity, Boundary, CancellationFlag, Catalog,
    CatalogEntry, ClientConfig, Clock, CoordinatorConfig, NavigationEngine, PageImages, PageLabel,
    SecureExtractor, SharedCatalog, StorageLayout, SyncCoordinator, SyncEvent, SyncPlan,
    SyncReport, Transition,
};

// Credentials and configuration
pub use crate::auth::Credentials;
pub use crate::config::AppConfig;

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
