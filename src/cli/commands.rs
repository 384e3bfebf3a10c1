//! Command handlers for the Paper Kiosk CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! and the loaded configuration to the engine components.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::app::{
    prune_entries, system_clock, ArchiveClient, ArchiveIdentity, Boundary, CancellationFlag,
    Catalog, CatalogEntry, CoordinatorConfig, NavigationEngine, SecureExtractor, SharedCatalog,
    SignalHandler, StorageLayout, SyncCoordinator, SyncPlan, Transition,
};
use crate::auth::{setup_credentials, show_credential_status, Credentials};
use crate::cli::{
    AuthAction, AuthArgs, CatalogArgs, ConfigAction, ConfigArgs, DisplayMode, PageArgs, PageStep,
    PruneArgs, SyncArgs, SyncProgressDisplay,
};
use crate::config::AppConfig;
use crate::errors::{AppError, ConfigError, NavResult, Result, SyncError};

/// Handle the sync command
///
/// Fetches the remote listing, plans against the catalog and runs the
/// plan on a background task while the progress display consumes its
/// events. Ctrl-C stops the run after the current chunk or member.
pub async fn handle_sync(args: SyncArgs, config: &AppConfig, quiet: bool) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let credentials = resolve_credentials(config)?;
    let (layout, client_config, mut coordinator_config) = config.to_runtime_config();
    if let Some(days) = args.retention_days {
        coordinator_config = coordinator_config.with_retention_days(days);
    }
    validate_coordinator(&coordinator_config)?;

    // Corrupt catalogs abort here, before anything is touched
    let catalog = open_catalog(&layout)?;

    let client = ArchiveClient::new(credentials.host(), &client_config, layout.downloads_dir())?;
    let extractor = SecureExtractor::new(credentials.archive_key(), layout.renderings_dir());
    let coordinator = SyncCoordinator::new(
        coordinator_config.clone(),
        client,
        extractor,
        catalog,
        system_clock(),
    );

    let listing = coordinator.fetch_listing().await?;
    let sync_plan = coordinator.plan(&listing)?;
    info!(
        listed = listing.len(),
        planned = sync_plan.len(),
        "Remote listing fetched"
    );

    if args.dry_run {
        print_plan(&sync_plan, coordinator_config.retention_days);
        return Ok(());
    }

    let cancel = CancellationFlag::new();
    let signal_handle = SignalHandler::new(cancel.clone()).setup();

    let (handle, events) = coordinator.spawn(sync_plan, cancel);
    let mut display = SyncProgressDisplay::new(DisplayMode::detect(quiet));
    display.consume(events).await;

    let outcome = handle.await.map_err(|e| SyncError::TaskFailed {
        archive: "sync".to_string(),
        reason: e.to_string(),
    })?;
    signal_handle.abort();
    drop(display);

    let report = outcome?;
    if report.cancelled {
        println!(
            "🛑 Sync cancelled after {} archive(s); partial files were removed",
            report.committed.len()
        );
        return Ok(());
    }

    if report.committed.is_empty() {
        println!("✅ Catalog is up to date");
    } else {
        println!(
            "✅ Synchronized {} archive(s) in {:.1}s",
            report.committed.len(),
            report.duration.as_secs_f64()
        );
        for key in &report.committed {
            println!("   {}", key);
        }
    }

    if coordinator_config.prune_enabled() && !args.no_prune {
        let removed = coordinator.prune(coordinator_config.keep_days)?;
        if !removed.is_empty() {
            println!("🧹 Pruned {} old entr(ies)", removed.len());
        }
    }

    Ok(())
}

/// Handle the catalog command
pub fn handle_catalog(args: CatalogArgs, config: &AppConfig) -> Result<()> {
    let (layout, _, _) = config.to_runtime_config();
    let catalog = Catalog::open(layout.catalog_file())?;

    let rows = catalog_rows(&catalog, args.source.as_deref());
    if rows.is_empty() {
        println!("No entries in {}", layout.catalog_file().display());
    } else {
        println!("{:<20} {:>9} {:>12}", "Entry", "Page", "DPI lo/hi");
        for (key, entry) in &rows {
            println!(
                "{:<20} {:>4}/{:<4} {:>5}/{:<6}",
                key, entry.page, entry.page_count, entry.dpi_low, entry.dpi_high
            );
        }
    }

    let bookmarks: Vec<(&str, &str)> = catalog
        .bookmarks()
        .filter(|(source, _)| args.source.as_deref().map_or(true, |s| s == *source))
        .collect();
    if !bookmarks.is_empty() {
        println!();
        println!("Bookmarks:");
        for (source, key) in bookmarks {
            let marker = if catalog.contains(key) { "" } else { " (missing)" };
            println!("   {} -> {}{}", source, key, marker);
        }
    }

    Ok(())
}

/// Handle the prune command
pub fn handle_prune(args: PruneArgs, config: &AppConfig) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let (layout, _, coordinator_config) = config.to_runtime_config();
    let keep_days = args.keep_days.unwrap_or(coordinator_config.keep_days);
    if keep_days == 0 && args.keep_days.is_none() {
        println!("Pruning is disabled ([sync] keep_days = 0). Pass --keep-days to prune anyway.");
        return Ok(());
    }

    let catalog = open_catalog(&layout)?;
    let today = system_clock().today();
    let removed = prune_entries(&catalog, layout.renderings_dir(), today, keep_days)?;

    if removed.is_empty() {
        println!("Nothing to prune");
    } else {
        println!("🧹 Removed {} entr(ies):", removed.len());
        for key in removed {
            println!("   {}", key);
        }
    }
    Ok(())
}

/// Handle the page command
///
/// Selects the source, applies each step in order and prints the outcome,
/// then shows the label and images of the page under the cursor.
pub fn handle_page(args: PageArgs, config: &AppConfig) -> Result<()> {
    let (layout, _, _) = config.to_runtime_config();
    let source = args
        .source
        .clone()
        .unwrap_or_else(|| config.sources.default.clone());

    let catalog = open_catalog(&layout)?;
    let mut nav = NavigationEngine::new(catalog, layout, system_clock(), &source)?;

    for step in &args.steps {
        let outcome = apply_step(&mut nav, *step)?;
        println!("{:<12} {}", format!("{:?}", step), outcome);
    }

    for line in describe_cursor(&nav, config)? {
        println!("{}", line);
    }
    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(
    args: ConfigArgs,
    config: &AppConfig,
    config_override: Option<&Path>,
) -> Result<()> {
    match args.action {
        ConfigAction::Init { path, force } => {
            match path {
                Some(path) => {
                    if path.exists() && !force {
                        println!(
                            "{} already exists. Use --force to overwrite.",
                            path.display()
                        );
                        return Ok(());
                    }
                    AppConfig::write_default_config(&path).await?;
                    println!("Wrote default configuration to {}", path.display());
                }
                None => {
                    let default_path = AppConfig::get_default_config_path()?;
                    if force && default_path.exists() {
                        AppConfig::write_default_config(&default_path).await?;
                        println!("Rewrote {}", default_path.display());
                    } else {
                        let path = AppConfig::initialize_first_run().await?;
                        debug!("Config file at {}", path.display());
                    }
                }
            }
        }
        ConfigAction::Show => {
            print!("{}", config.to_display_toml()?);
        }
        ConfigAction::Path => {
            let found = config_override
                .map(Path::to_path_buf)
                .or_else(AppConfig::find_config_file);
            match found {
                Some(path) => println!("{}", path.display()),
                None => println!("No configuration file found; using defaults"),
            }
        }
    }
    Ok(())
}

/// Handle credential commands
pub async fn handle_auth(args: AuthArgs, config: &AppConfig) -> Result<()> {
    let client_config = config.client.to_runtime_config();
    match args.action {
        AuthAction::Setup => setup_credentials(&client_config).await?,
        AuthAction::Status { check } => {
            show_credential_status(
                config.server.host.as_deref(),
                config.server.archive_key.as_deref(),
                check,
                &client_config,
            )
            .await?
        }
    }
    Ok(())
}

/// Apply one navigation step and describe its outcome
pub fn apply_step(nav: &mut NavigationEngine, step: PageStep) -> NavResult<String> {
    let transition = match step {
        PageStep::NextEntry => nav.next_entry(),
        PageStep::PrevEntry => nav.prev_entry(),
        PageStep::NextPage => nav.next_page()?,
        PageStep::PrevPage => nav.prev_page()?,
        PageStep::FirstPage => nav.first_page()?,
        PageStep::LastPage => nav.last_page()?,
        PageStep::Bookmark => {
            nav.create_bookmark()?;
            return Ok(format!("bookmarked {}", nav.current_key()));
        }
        PageStep::Unbookmark => {
            nav.remove_bookmark()?;
            return Ok(format!("bookmark for {} removed", nav.current_source()));
        }
        PageStep::Newest => {
            nav.jump_to_newest()?;
            return Ok(format!("jumped to {}", nav.current_key()));
        }
    };
    Ok(describe_transition(transition))
}

/// Short text for a transition
pub fn describe_transition(transition: Transition) -> String {
    match transition {
        Transition::Moved => "ok".to_string(),
        Transition::Boundary(Boundary::Today) => "already at today".to_string(),
        Transition::Boundary(Boundary::FirstPage) => "already at first page".to_string(),
        Transition::Boundary(Boundary::LastPage) => "already at last page".to_string(),
        Transition::MissingEntry => "no entry for this date".to_string(),
    }
}

/// Lines describing the page under the cursor
fn describe_cursor(nav: &NavigationEngine, config: &AppConfig) -> NavResult<Vec<String>> {
    let mut lines = Vec::new();

    match nav.page_label(&config.sources.labels) {
        Ok(label) => lines.push(format!("{}, {}", label.entry, label.page)),
        Err(e) => {
            warn!("{}", e);
            lines.push(nav.current_key());
        }
    }

    if !nav.entry_exists()? {
        lines.push("   (no entry; run 'sync' or step to another date)".to_string());
        return Ok(lines);
    }

    if nav.bookmark_is_set()? {
        lines.push("   bookmarked".to_string());
    }
    let images = nav.resolve_images()?;
    lines.push(format!("   low:  {}", images.low_res.display()));
    lines.push(format!("   high: {}", images.high_res.display()));
    lines.push(format!("   dpi ratio: {:.3}", nav.dpi_ratio()?));
    Ok(lines)
}

/// Catalog entries sorted by source, then date
fn catalog_rows<'a>(
    catalog: &'a Catalog,
    source: Option<&str>,
) -> Vec<(&'a str, &'a CatalogEntry)> {
    let mut rows: Vec<(ArchiveIdentity, &str, &CatalogEntry)> = catalog
        .entries()
        .filter_map(|(key, entry)| {
            ArchiveIdentity::parse(key)
                .ok()
                .map(|identity| (identity, key, entry))
        })
        .filter(|(identity, _, _)| source.map_or(true, |s| identity.source == s))
        .collect();
    rows.sort_by(|a, b| (&a.0.source, a.0.date).cmp(&(&b.0.source, b.0.date)));
    rows.into_iter().map(|(_, key, entry)| (key, entry)).collect()
}

fn print_plan(sync_plan: &SyncPlan, retention_days: i64) {
    if sync_plan.is_empty() {
        println!(
            "Dry run - nothing to download (retention {} day(s))",
            retention_days
        );
    } else {
        println!("Dry run - would download {} archive(s):", sync_plan.len());
        for (i, identity) in sync_plan.items.iter().enumerate() {
            println!("  {}. {}", i + 1, identity.filename());
        }
    }
    if !sync_plan.rejected.is_empty() {
        println!("Ignored {} unrecognized name(s):", sync_plan.rejected.len());
        for name in &sync_plan.rejected {
            println!("  {}", name);
        }
    }
}

fn resolve_credentials(config: &AppConfig) -> Result<Credentials> {
    Ok(Credentials::resolve(
        config.server.host.as_deref(),
        config.server.archive_key.as_deref(),
    )?)
}

fn validate_coordinator(config: &CoordinatorConfig) -> Result<()> {
    config.validate().map_err(|reason| {
        AppError::Config(ConfigError::InvalidValue {
            field: "sync".to_string(),
            value: format!(
                "retention_days={}, keep_days={}",
                config.retention_days, config.keep_days
            ),
            reason,
        })
    })
}

fn open_catalog(layout: &StorageLayout) -> Result<SharedCatalog> {
    let catalog = Catalog::open(layout.catalog_file())?;
    debug!(
        entries = catalog.len(),
        path = %layout.catalog_file().display(),
        "Catalog opened"
    );
    Ok(catalog.into_shared())
}
