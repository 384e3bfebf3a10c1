//! Command-line interface components
//!
//! This module contains CLI-specific code for the Paper Kiosk binary,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    AuthAction, AuthArgs, CatalogArgs, Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs,
    PageArgs, PageStep, PruneArgs, SyncArgs,
};
pub use commands::{
    apply_step, describe_transition, handle_auth, handle_catalog, handle_config, handle_page,
    handle_prune, handle_sync,
};
pub use progress::{DisplayMode, SyncProgressDisplay};
