//! Configuration management for Paper Kiosk
//!
//! This module provides the TOML application configuration with automatic
//! first-run initialization, standard search locations and zero-config
//! defaults for everything except the archive credentials.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, CoordinatorConfig, StorageLayout};
use crate::constants::{files, http, sync};
use crate::errors::{ConfigError, ConfigResult};

const APP_DIR: &str = "paper-kiosk";
const LOCAL_CONFIG_FILE: &str = "./paper-kiosk.toml";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Archive server settings
    pub server: ServerConfigToml,
    /// Where archives, renderings and the catalog live
    pub storage: StorageConfigToml,
    /// Retention settings
    pub sync: SyncConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Newspaper sources and their display labels
    pub sources: SourcesConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Archive server settings
///
/// Both values may be left out and supplied through `PAPER_KIOSK_HOST` and
/// `PAPER_KIOSK_ARCHIVE_KEY` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfigToml {
    /// Base URL serving the index and the archives
    pub host: Option<String>,
    /// Shared secret the per-archive passwords are derived from
    pub archive_key: Option<String>,
}

/// Storage locations
///
/// `root` defaults to the user data directory. The three explicit paths
/// default to their usual names below `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfigToml {
    pub root: Option<PathBuf>,
    pub downloads: Option<PathBuf>,
    pub renderings: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
}

/// Retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfigToml {
    /// Archives older than this many days are not downloaded
    pub retention_days: i64,
    /// Entries older than this many days are pruned after a sync (0 = never)
    pub keep_days: i64,
}

impl Default for SyncConfigToml {
    fn default() -> Self {
        Self {
            retention_days: sync::DEFAULT_RETENTION_DAYS,
            keep_days: sync::DEFAULT_KEEP_DAYS,
        }
    }
}

/// TOML-friendly client configuration
///
/// Durations are written in humantime form, e.g. `"30s"` or `"1m 30s"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Timeout for the index request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Maximum wait for a single body chunk
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// TCP keep-alive (unset = disabled)
    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout (unset = no timeout)
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        let runtime = ClientConfig::default();
        Self {
            request_timeout: runtime.request_timeout,
            connect_timeout: runtime.connect_timeout,
            read_timeout: runtime.read_timeout,
            tcp_keepalive: runtime.tcp_keepalive,
            tcp_nodelay: runtime.tcp_nodelay,
            pool_idle_timeout: runtime.pool_idle_timeout,
        }
    }
}

/// Newspaper sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfigToml {
    /// Source selected when none is given on the command line
    pub default: String,
    /// Display label per source identifier
    pub labels: BTreeMap<String, String>,
}

impl Default for SourcesConfigToml {
    fn default() -> Self {
        Self {
            default: "haz".to_string(),
            labels: BTreeMap::from([("haz".to_string(), "HAZ".to_string())]),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag or RUST_LOG is given
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert to the runtime configuration of the engine components
    pub fn to_runtime_config(&self) -> (StorageLayout, ClientConfig, CoordinatorConfig) {
        (
            self.storage.to_layout(),
            self.client.to_runtime_config(),
            self.sync.to_runtime_config(),
        )
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one the standard locations are
    /// searched and the defaults are used if none has a file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` for a missing explicit file, and
    /// `ConfigError::Io`/`InvalidFormat`/`InvalidValue` if a file cannot be
    /// read, parsed or validated.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound { path }),
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> ConfigResult<()> {
        self.sync
            .to_runtime_config()
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "sync".to_string(),
                value: format!(
                    "retention_days={}, keep_days={}",
                    self.sync.retention_days, self.sync.keep_days
                ),
                reason,
            })?;

        if self.sources.default.is_empty() {
            return Err(ConfigError::MissingField {
                field: "sources.default".to_string(),
            });
        }

        if self.client.read_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "client.read_timeout".to_string(),
                value: "0s".to_string(),
                reason: "A zero read timeout would fail every download".to_string(),
            });
        }

        Ok(())
    }

    /// Initialize configuration on first run
    ///
    /// Creates a commented default config file in the user config directory
    /// if none exists. Returns the path of the file.
    pub async fn initialize_first_run() -> ConfigResult<PathBuf> {
        let config_path = Self::get_default_config_path()?;

        if config_path.exists() {
            return Ok(config_path);
        }

        info!("Creating default configuration file...");
        Self::write_default_config(&config_path).await?;

        println!("Created default configuration file:");
        println!("   {}", config_path.display());
        println!("   Set [server] host and archive_key, or run 'auth setup'.");
        println!();

        Ok(config_path)
    }

    /// Write the commented default configuration to `path`
    pub async fn write_default_config(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Render the effective configuration with the archive key masked
    pub fn to_display_toml(&self) -> ConfigResult<String> {
        let mut shown = self.clone();
        if shown.server.archive_key.is_some() {
            shown.server.archive_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })
    }

    /// Find configuration file in standard locations
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Ok(path) = Self::get_default_config_path() {
            search_paths.push(path);
        }
        #[cfg(unix)]
        search_paths.push(PathBuf::from("/etc/paper-kiosk/config.toml"));

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::MissingField {
            field: "user config directory".to_string(),
        })?;

        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# Paper Kiosk Configuration
# This file was automatically generated on first run.

[server]
# Archive server base URL (or set PAPER_KIOSK_HOST)
# host = "https://archive.example.org/kiosk/"
# Shared archive key (or set PAPER_KIOSK_ARCHIVE_KEY)
# archive_key = ""

[storage]
# Base directory; defaults to the user data directory
# root = "/var/lib/paper-kiosk"
# downloads = "/var/lib/paper-kiosk/{downloads}"
# renderings = "/var/lib/paper-kiosk/{renderings}"
# catalog = "/var/lib/paper-kiosk/{catalog}"

[sync]
# Archives older than this many days are not downloaded
retention_days = {retention}
# Entries older than this many days are removed after a sync (0 = never)
keep_days = {keep}

[client]
request_timeout = "{request}s"
connect_timeout = "{connect}s"
read_timeout = "{read}s"
tcp_keepalive = "30s"
tcp_nodelay = true
pool_idle_timeout = "{idle}s"

[sources]
default = "haz"

[sources.labels]
haz = "HAZ"

[logging]
level = "warn"  # error, warn, info, debug, trace
colored_output = true
"#,
            downloads = files::DOWNLOADS_DIR,
            renderings = files::RENDERINGS_DIR,
            catalog = files::CATALOG_FILE,
            retention = sync::DEFAULT_RETENTION_DAYS,
            keep = sync::DEFAULT_KEEP_DAYS,
            request = http::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            connect = http::CONNECT_TIMEOUT.as_secs(),
            read = http::READ_TIMEOUT.as_secs(),
            idle = http::POOL_IDLE_TIMEOUT.as_secs(),
        )
    }
}

impl StorageConfigToml {
    /// Resolve the storage layout
    pub fn to_layout(&self) -> StorageLayout {
        let root = self.root.clone().unwrap_or_else(default_storage_root);
        let base = StorageLayout::new(&root);

        StorageLayout::with_paths(
            self.downloads
                .clone()
                .unwrap_or_else(|| base.downloads_dir().to_path_buf()),
            self.renderings
                .clone()
                .unwrap_or_else(|| base.renderings_dir().to_path_buf()),
            self.catalog
                .clone()
                .unwrap_or_else(|| base.catalog_file().to_path_buf()),
        )
    }
}

fn default_storage_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl SyncConfigToml {
    /// Convert to runtime CoordinatorConfig
    pub fn to_runtime_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_retention_days(self.retention_days)
            .with_keep_days(self.keep_days)
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            tcp_keepalive: self.tcp_keepalive,
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
        }
    }
}
