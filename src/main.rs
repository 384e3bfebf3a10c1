//! Paper Kiosk CLI application
//!
//! Command-line interface for synchronizing newspaper page archives and
//! navigating the local catalog.

use std::process;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use paper_kiosk::cli::{
    handle_auth, handle_catalog, handle_config, handle_page, handle_prune, handle_sync, Cli,
    Commands,
};
use paper_kiosk::config::AppConfig;
use paper_kiosk::AppError;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if let Some(app_error) = e.downcast_ref::<AppError>() {
            debug!(
                category = app_error.category(),
                kind = %app_error.kind(),
                "Command failed"
            );
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> anyhow::Result<()> {
    // Credentials may live in .env; a missing file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone())
        .await
        .map_err(AppError::from)
        .context("Failed to load configuration")?;
    if let Some(dir) = &cli.global.data_dir {
        config.storage.root = Some(dir.clone());
    }

    init_logging(&cli, &config);
    info!("Paper Kiosk v{} starting", env!("CARGO_PKG_VERSION"));

    let outcome = match cli.command {
        Commands::Sync(args) => {
            info!("Executing sync command");
            handle_sync(args, &config, cli.global.quiet).await
        }
        Commands::Catalog(args) => handle_catalog(args, &config),
        Commands::Prune(args) => {
            info!("Executing prune command");
            handle_prune(args, &config)
        }
        Commands::Page(args) => handle_page(args, &config),
        Commands::Config(args) => handle_config(args, &config, cli.global.config.as_deref()).await,
        Commands::Auth(args) => handle_auth(args, &config).await,
    };
    Ok(outcome?)
}

/// Initialize logging based on CLI verbosity settings
///
/// `RUST_LOG` wins; otherwise the verbosity flags pick the level for this
/// crate, falling back to `[logging] level` when no flag is given.
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = if cli.global.quiet || cli.global.verbose || cli.global.very_verbose {
        cli.log_level().to_string().to_lowercase()
    } else {
        config.logging.level.clone()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("paper_kiosk={}", level)))
        .unwrap_or_else(|_| EnvFilter::new("paper_kiosk=warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(config.logging.colored_output)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
