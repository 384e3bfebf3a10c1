//! Command-line argument parsing for Paper Kiosk
//!
//! This module defines the CLI structure using clap derive macros. The
//! binary drives the engine headlessly: synchronizing archives, inspecting
//! and pruning the catalog, stepping through pages and managing the
//! configuration and credentials.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Paper Kiosk - newspaper archive sync and page navigation
#[derive(Parser, Debug)]
#[command(
    name = "paper_kiosk",
    version,
    about = "Synchronize newspaper page archives and navigate the local catalog",
    long_about = "Downloads dated, password-protected newspaper archives from the archive server,
unpacks them into per-page images and keeps a catalog of entries, pages and bookmarks."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Storage root, overriding [storage] root
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and unpack missing recent archives
    Sync(SyncArgs),

    /// List catalog entries and bookmarks
    Catalog(CatalogArgs),

    /// Remove old entries and their page images
    Prune(PruneArgs),

    /// Navigate entries and pages of a source
    Page(PageArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Manage archive server credentials
    Auth(AuthArgs),
}

/// Arguments for the sync command
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Download archives at most this many days old (overrides [sync] retention_days)
    #[arg(short, long, value_name = "DAYS")]
    pub retention_days: Option<i64>,

    /// Show what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the prune configured by [sync] keep_days
    #[arg(long)]
    pub no_prune: bool,
}

/// Arguments for the catalog command
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Only list entries of this source
    #[arg(short, long)]
    pub source: Option<String>,
}

/// Arguments for the prune command
#[derive(Args, Debug, Clone)]
pub struct PruneArgs {
    /// Remove entries more than this many days old (overrides [sync] keep_days)
    #[arg(short, long, value_name = "DAYS")]
    pub keep_days: Option<i64>,
}

/// Arguments for the page command
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// Source to select (defaults to [sources] default)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Navigation steps, applied in order after selecting the source
    #[arg(value_enum, value_name = "STEP")]
    pub steps: Vec<PageStep>,
}

/// A single navigation step
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    /// Move one day forward
    NextEntry,
    /// Move one day back
    PrevEntry,
    /// Turn to the next page
    NextPage,
    /// Turn to the previous page
    PrevPage,
    /// Turn to the first page
    FirstPage,
    /// Turn to the last page
    LastPage,
    /// Bookmark the current entry
    Bookmark,
    /// Remove the source's bookmark
    Unbookmark,
    /// Jump to the newest entry and clear the bookmark
    Newest,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Write to this path instead of the user config directory
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Show which configuration file is used
    Path,
}

/// Arguments for credential management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Credential actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Enter host and archive key and store them in .env
    Setup,

    /// Show credential status
    Status {
        /// Also check that the host answers
        #[arg(long)]
        check: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl SyncArgs {
    /// Reject nonsensical overrides
    pub fn validate(&self) -> Result<(), String> {
        match self.retention_days {
            Some(days) if days < 0 => Err("Retention days cannot be negative".to_string()),
            _ => Ok(()),
        }
    }
}

impl PruneArgs {
    /// Reject nonsensical overrides
    pub fn validate(&self) -> Result<(), String> {
        match self.keep_days {
            Some(days) if days < 0 => Err("Keep days cannot be negative".to_string()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_steps_parse_in_order() {
        let cli = Cli::try_parse_from([
            "paper_kiosk",
            "page",
            "--source",
            "haz",
            "prev-entry",
            "last-page",
            "bookmark",
        ])
        .unwrap();

        match cli.command {
            Commands::Page(args) => {
                assert_eq!(args.source.as_deref(), Some("haz"));
                assert_eq!(
                    args.steps,
                    [PageStep::PrevEntry, PageStep::LastPage, PageStep::Bookmark]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli =
            Cli::try_parse_from(["paper_kiosk", "sync", "--dry-run", "-q", "--data-dir", "/srv"])
                .unwrap();

        assert!(cli.global.quiet);
        assert_eq!(cli.global.data_dir, Some(PathBuf::from("/srv")));
        assert!(matches!(cli.command, Commands::Sync(SyncArgs { dry_run: true, .. })));
    }

    #[test]
    fn test_override_validation() {
        let sync = SyncArgs {
            retention_days: Some(-1),
            dry_run: false,
            no_prune: false,
        };
        assert!(sync.validate().is_err());

        let prune = PruneArgs { keep_days: Some(3) };
        assert!(prune.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli::try_parse_from(["paper_kiosk", "-q", "auth", "status"]).unwrap();
        let cli_verbose = Cli::try_parse_from(["paper_kiosk", "-v", "catalog"]).unwrap();
        let cli_default = Cli::try_parse_from(["paper_kiosk", "config", "show"]).unwrap();

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
        assert_eq!(cli_default.log_level(), tracing::Level::WARN);
    }
}
