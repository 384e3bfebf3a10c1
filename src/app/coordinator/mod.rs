//! Archive synchronization
//!
//! The coordinator compares the remote listing with the catalog, downloads
//! and extracts missing archives one at a time, and commits each finished
//! archive to the catalog before starting the next. Progress and lifecycle
//! events flow back to the caller over an unbounded channel.
//!
//! # Architecture
//!
//! - [`config`] - Retention and pruning settings
//! - [`plan`] - Selection of the archives to fetch
//! - [`progress`] - Sync events and overall progress
//! - [`prune`] - Removal of expired entries
//! - [`signals`] - Signal handling for graceful shutdown
//!
//! # Examples
//!
//! ```rust,no_run
//! use paper_kiosk::app::{
//!     system_clock, ArchiveClient, CancellationFlag, Catalog, ClientConfig,
//!     CoordinatorConfig, SecureExtractor, StorageLayout, SyncCoordinator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = StorageLayout::new("/var/lib/paper-kiosk");
//! let catalog = Catalog::open(layout.catalog_file())?.into_shared();
//! let client = ArchiveClient::new(
//!     "https://archive.example.org/",
//!     &ClientConfig::default(),
//!     layout.downloads_dir(),
//! )?;
//! let extractor = SecureExtractor::new("secret", layout.renderings_dir());
//!
//! let coordinator = SyncCoordinator::new(
//!     CoordinatorConfig::default(),
//!     client,
//!     extractor,
//!     catalog,
//!     system_clock(),
//! );
//!
//! let listing = coordinator.fetch_listing().await?;
//! let plan = coordinator.plan(&listing)?;
//! let (handle, mut events) = coordinator.spawn(plan, CancellationFlag::new());
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! let report = handle.await??;
//! println!("Committed {} archives", report.committed.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod plan;
pub mod progress;
pub mod prune;
pub mod signals;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::cancel::CancellationFlag;
use crate::app::catalog::{self, CatalogEntry, SharedCatalog};
use crate::app::client::{ArchiveClient, RemoteListing};
use crate::app::clock::SharedClock;
use crate::app::extract::SecureExtractor;
use crate::app::naming::ArchiveIdentity;
use crate::errors::{SyncError, SyncResult};

pub use config::CoordinatorConfig;
pub use plan::SyncPlan;
pub use progress::{overall_progress, OverallProgress, SyncEvent};
pub use prune::prune_entries;
pub use signals::SignalHandler;

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Keys of the entries committed during the run, in order
    pub committed: Vec<String>,
    /// Wall time of the run
    pub duration: Duration,
    /// Whether the run stopped early because of cancellation
    pub cancelled: bool,
}

/// Drives download, extraction and catalog commits
#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    config: CoordinatorConfig,
    client: ArchiveClient,
    extractor: SecureExtractor,
    catalog: SharedCatalog,
    clock: SharedClock,
}

impl SyncCoordinator {
    /// Create a coordinator over shared components
    pub fn new(
        config: CoordinatorConfig,
        client: ArchiveClient,
        extractor: SecureExtractor,
        catalog: SharedCatalog,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            client,
            extractor,
            catalog,
            clock,
        }
    }

    /// Coordinator configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Fetch the remote listing
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Index` carrying the network, timeout or protocol
    /// failure.
    pub async fn fetch_listing(&self) -> SyncResult<RemoteListing> {
        self.client.fetch_listing().await.map_err(SyncError::Index)
    }

    /// Compute the plan for a listing against the current catalog
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the catalog lock is poisoned.
    pub fn plan(&self, listing: &RemoteListing) -> SyncResult<SyncPlan> {
        let catalog = catalog::lock(&self.catalog)?;
        Ok(plan::plan(
            listing,
            &catalog,
            self.config.retention_days,
            self.clock.today(),
        ))
    }

    /// Fetch the listing, plan and run in one go
    ///
    /// # Errors
    ///
    /// See [`SyncCoordinator::fetch_listing`] and [`SyncCoordinator::run`].
    pub async fn sync_recent(
        &self,
        events: &UnboundedSender<SyncEvent>,
        cancel: &CancellationFlag,
    ) -> SyncResult<SyncReport> {
        let listing = self.fetch_listing().await?;
        let sync_plan = self.plan(&listing)?;
        self.run(sync_plan, events, cancel).await
    }

    /// Run the sync on a dedicated task
    ///
    /// The receiver yields events until the run ends; the handle resolves to
    /// the run's outcome.
    pub fn spawn(
        &self,
        sync_plan: SyncPlan,
        cancel: CancellationFlag,
    ) -> (JoinHandle<SyncResult<SyncReport>>, UnboundedReceiver<SyncEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let coordinator = self.clone();

        let handle = tokio::spawn(async move {
            coordinator.run(sync_plan, &events_tx, &cancel).await
        });

        (handle, events_rx)
    }

    /// Process every archive of the plan, strictly one at a time
    ///
    /// The first failure aborts the remaining archives; entries committed
    /// before it stay committed. Cancellation is not a failure: the run
    /// stops and reports `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns the first download, extraction or catalog error, keeping the
    /// originating error kind.
    pub async fn run(
        &self,
        sync_plan: SyncPlan,
        events: &UnboundedSender<SyncEvent>,
        cancel: &CancellationFlag,
    ) -> SyncResult<SyncReport> {
        let start = Instant::now();
        let total = sync_plan.items.len();
        let mut overall = OverallProgress::new(total);
        let mut report = SyncReport::default();

        let _ = events.send(SyncEvent::Planned {
            total,
            rejected: sync_plan.rejected.len(),
        });
        info!(total, "Starting sync");

        for (index, identity) in sync_plan.items.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let key = identity.key();
            info!(archive = %key, position = index + 1, total, "Archive started");
            let _ = events.send(SyncEvent::ArchiveStarted {
                index,
                total,
                key: key.clone(),
            });

            let outcome = self
                .process_archive(identity, index, &mut overall, events, cancel)
                .await;

            match outcome {
                Ok(()) => {
                    info!(archive = %key, "Archive committed");
                    let _ = events.send(SyncEvent::ArchiveCommitted { key: key.clone() });
                    report.committed.push(key);
                }
                Err(e) if e.is_cancelled() => {
                    info!(archive = %key, "Sync cancelled");
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!(archive = %key, kind = %e.kind(), "Sync failed: {}", e);
                    return Err(e);
                }
            }
        }

        if !report.cancelled {
            overall.complete(events);
        }
        report.duration = start.elapsed();

        let _ = events.send(SyncEvent::Finished {
            committed: report.committed.len(),
            cancelled: report.cancelled,
        });
        info!(
            committed = report.committed.len(),
            cancelled = report.cancelled,
            "Sync finished in {:.1}s",
            report.duration.as_secs_f64()
        );
        Ok(report)
    }

    async fn process_archive(
        &self,
        identity: &ArchiveIdentity,
        index: usize,
        overall: &mut OverallProgress,
        events: &UnboundedSender<SyncEvent>,
        cancel: &CancellationFlag,
    ) -> SyncResult<()> {
        let archive_path = self
            .client
            .download(identity, cancel, |value| overall.report(index, value, events))
            .await
            .map_err(|source| SyncError::Download {
                archive: identity.filename(),
                source,
            })?;

        let entry = self
            .extract_blocking(archive_path, identity, index, overall, events, cancel)
            .await?;

        // No cancellation check between extraction and commit
        self.commit(&identity.key(), entry)
    }

    async fn extract_blocking(
        &self,
        archive_path: PathBuf,
        identity: &ArchiveIdentity,
        index: usize,
        overall: &mut OverallProgress,
        events: &UnboundedSender<SyncEvent>,
        cancel: &CancellationFlag,
    ) -> SyncResult<CatalogEntry> {
        let extractor = self.extractor.clone();
        let task_identity = identity.clone();
        let task_events = events.clone();
        let task_cancel = cancel.clone();
        let mut task_overall = *overall;

        let joined = tokio::task::spawn_blocking(move || {
            let result = extractor.extract(&archive_path, &task_identity, &task_cancel, |value| {
                task_overall.report(index, value, &task_events)
            });
            (result, task_overall)
        })
        .await;

        let (result, updated) = joined.map_err(|e| SyncError::TaskFailed {
            archive: identity.filename(),
            reason: e.to_string(),
        })?;
        *overall = updated;

        result.map_err(|source| SyncError::Extract {
            archive: identity.filename(),
            source,
        })
    }

    fn commit(&self, key: &str, entry: CatalogEntry) -> SyncResult<()> {
        let mut catalog = catalog::lock(&self.catalog)?;
        catalog.upsert_entry(key, entry)?;
        Ok(())
    }

    /// Remove entries older than `keep_days`, with their page assets
    ///
    /// See [`prune::prune_entries`].
    pub fn prune(&self, keep_days: i64) -> SyncResult<Vec<String>> {
        prune::prune_entries(
            &self.catalog,
            self.extractor.renderings_dir(),
            self.clock.today(),
            keep_days,
        )
    }
}
