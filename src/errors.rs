//! Error types for Paper Kiosk
//!
//! This module defines the error types for every component of the engine.
//! Each component has its own enum so call sites can match on the failures
//! they care about, and every enum maps onto the shared [`ErrorKind`]
//! taxonomy so the presentation layer can decide how to react without
//! knowing where an error came from.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification shared by every error in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport or connection failure
    Network,
    /// The server answered with something other than what was expected
    Protocol,
    /// Malformed archive name, metadata file or persisted catalog
    Format,
    /// Wrong derived password or corrupt encrypted header
    Crypto,
    /// The catalog references files that are missing on disk
    NotFound,
    /// Local filesystem failure
    Io,
    /// A network operation exceeded its time budget
    Timeout,
    /// The operation was aborted through the cancellation flag
    Cancelled,
    /// Invalid or missing configuration
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Format => "format",
            ErrorKind::Crypto => "crypto",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Io => "io",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Archive naming errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// The name does not split into exactly one source and one date
    #[error("Invalid archive name '{name}': expected '<source>_<DD-MM-YYYY>'")]
    InvalidSeparator { name: String },

    /// The source segment is empty or contains the separator
    #[error("Invalid source '{source_name}' in archive name")]
    InvalidSource { source_name: String },

    /// The date segment is not a valid DD-MM-YYYY date
    #[error("Invalid date '{date}' in archive name '{name}'")]
    InvalidDate { name: String, date: String },
}

impl NamingError {
    /// All naming errors are format errors
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Format
    }
}

/// Remote index and download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request or chunk read timed out
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// The index document did not have the expected shape
    #[error("Unexpected index response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// The body ended before the declared content length
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },

    /// Download aborted through the cancellation flag
    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            DownloadError::Http(e) if e.is_decode() => ErrorKind::Protocol,
            DownloadError::Http(_) | DownloadError::IncompleteDownload { .. } => {
                ErrorKind::Network
            }
            DownloadError::Timeout { .. } => ErrorKind::Timeout,
            DownloadError::InvalidUrl { .. } => ErrorKind::Config,
            DownloadError::ServerError { .. } | DownloadError::UnexpectedResponse { .. } => {
                ErrorKind::Protocol
            }
            DownloadError::Io(_) | DownloadError::AtomicOperationFailed { .. } => ErrorKind::Io,
            DownloadError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Archive decryption and extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The derived password was rejected
    #[error("Invalid password for archive {path}")]
    InvalidPassword { path: PathBuf },

    /// The encrypted payload could not be decrypted
    #[error("Failed to decrypt member '{member}' of {path}: {reason}")]
    Decryption {
        path: PathBuf,
        member: String,
        reason: String,
    },

    /// The archive structure is malformed
    #[error("Malformed archive {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// A member would be written outside the extraction directory
    #[error("Unsafe member path '{member}' in archive {path}")]
    UnsafeMember { path: PathBuf, member: String },

    /// The extracted tree has no metadata file
    #[error("Metadata file missing: {path}")]
    MissingMetadata { path: PathBuf },

    /// The metadata file could not be parsed
    #[error("Invalid metadata file {path}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    /// I/O error while extracting
    #[error("Extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Extraction aborted through the cancellation flag
    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidPassword { .. } | ExtractError::Decryption { .. } => {
                ErrorKind::Crypto
            }
            ExtractError::Malformed { .. }
            | ExtractError::UnsafeMember { .. }
            | ExtractError::MissingMetadata { .. }
            | ExtractError::InvalidMetadata { .. } => ErrorKind::Format,
            ExtractError::Io(_) => ErrorKind::Io,
            ExtractError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Catalog persistence errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The persisted catalog is not valid JSON of the expected shape
    #[error("Catalog file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// An entry or bookmark key is not a valid archive key
    #[error("Catalog key '{key}' is invalid: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: NamingError,
    },

    /// An entry violates its page or DPI invariants
    #[error("Catalog entry '{key}' is invalid: {reason}")]
    InvalidEntry { key: String, reason: String },

    /// Referenced entry does not exist
    #[error("Catalog entry '{key}' does not exist")]
    UnknownEntry { key: String },

    /// Serialization failed while persisting
    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Filesystem failure while loading or persisting
    #[error("Catalog I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A previous holder of the catalog lock panicked
    #[error("Catalog lock poisoned")]
    LockPoisoned,
}

impl CatalogError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Corrupt { .. }
            | CatalogError::InvalidKey { .. }
            | CatalogError::InvalidEntry { .. }
            | CatalogError::Serialize(_) => ErrorKind::Format,
            CatalogError::UnknownEntry { .. } => ErrorKind::NotFound,
            CatalogError::Io { .. } | CatalogError::LockPoisoned => ErrorKind::Io,
        }
    }
}

/// Navigation errors
///
/// Boundary conditions are not errors; they are reported through
/// `Transition`. These variants cover integrity and persistence failures.
#[derive(Error, Debug)]
pub enum NavigationError {
    /// The current entry does not exist in the catalog
    #[error("No catalog entry for '{key}'")]
    NoEntry { key: String },

    /// The catalog claims the entry exists but its page images are missing
    #[error("Page images for '{key}' not found: {path}")]
    MissingPages { key: String, path: PathBuf },

    /// No display label is configured for the source
    #[error("Unknown source '{source_name}'")]
    UnknownSource { source_name: String },

    /// Underlying catalog failure
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl NavigationError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavigationError::NoEntry { .. } | NavigationError::MissingPages { .. } => {
                ErrorKind::NotFound
            }
            NavigationError::UnknownSource { .. } => ErrorKind::Format,
            NavigationError::Catalog(e) => e.kind(),
        }
    }
}

/// Synchronization errors
///
/// Wraps the originating error together with the archive it happened on.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Fetching the remote listing failed
    #[error("Failed to fetch remote index: {0}")]
    Index(#[source] DownloadError),

    /// Downloading an archive failed
    #[error("Failed to download {archive}: {source}")]
    Download {
        archive: String,
        #[source]
        source: DownloadError,
    },

    /// Extracting an archive failed
    #[error("Failed to extract {archive}: {source}")]
    Extract {
        archive: String,
        #[source]
        source: ExtractError,
    },

    /// Committing to the catalog failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The blocking extraction task panicked
    #[error("Extraction task for {archive} failed: {reason}")]
    TaskFailed { archive: String, reason: String },
}

impl SyncError {
    /// Classify the error by its originating kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Index(e) | SyncError::Download { source: e, .. } => e.kind(),
            SyncError::Extract { source, .. } => source.kind(),
            SyncError::Catalog(e) => e.kind(),
            SyncError::TaskFailed { .. } => ErrorKind::Io,
        }
    }

    /// Whether the run stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Missing required configuration field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Filesystem failure while reading or writing configuration
    #[error("Configuration I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Credential errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Host or shared secret not configured anywhere
    #[error(
        "Missing archive credentials. Set PAPER_KIOSK_HOST and PAPER_KIOSK_ARCHIVE_KEY, add them to the [server] section, or run 'auth setup'"
    )]
    MissingCredentials,

    /// The configured host is not a usable URL
    #[error("Invalid archive host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    /// Empty input during interactive setup
    #[error("{field} cannot be empty")]
    EmptyInput { field: &'static str },

    /// File I/O error during credential storage
    #[error("Failed to save credentials to file")]
    CredentialStorage(#[from] std::io::Error),
}

impl AuthError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::CredentialStorage(_) => ErrorKind::Io,
            _ => ErrorKind::Config,
        }
    }
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Archive naming error
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extraction error
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Navigation error
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// Synchronization error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Auth(e) => e.kind(),
            AppError::Naming(e) => e.kind(),
            AppError::Download(e) => e.kind(),
            AppError::Extract(e) => e.kind(),
            AppError::Catalog(e) => e.kind(),
            AppError::Navigation(e) => e.kind(),
            AppError::Sync(e) => e.kind(),
            AppError::Config(_) => ErrorKind::Config,
            AppError::Io(_) => ErrorKind::Io,
            AppError::Generic { .. } => ErrorKind::Io,
        }
    }

    /// Check if the error is transient and a later retry may succeed
    ///
    /// Retry policy belongs to the caller; nothing in the engine retries.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Timeout)
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "auth",
            AppError::Naming(_) => "naming",
            AppError::Download(_) => "download",
            AppError::Extract(_) => "extract",
            AppError::Catalog(_) => "catalog",
            AppError::Navigation(_) => "navigation",
            AppError::Sync(_) => "sync",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Credential result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Naming result type alias
pub type NamingResult<T> = std::result::Result<T, NamingError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Extraction result type alias
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Navigation result type alias
pub type NavResult<T> = std::result::Result<T, NavigationError>;

/// Sync result type alias
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_surfaces_originating_kind() {
        let err = SyncError::Extract {
            archive: "haz_01-06-2024.zip".to_string(),
            source: ExtractError::InvalidPassword {
                path: PathBuf::from("downloads/haz_01-06-2024.zip"),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Crypto);

        let err = SyncError::Download {
            archive: "haz_01-06-2024.zip".to_string(),
            source: DownloadError::Timeout { seconds: 30 },
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!err.is_cancelled());

        let err = SyncError::Download {
            archive: "haz_01-06-2024.zip".to_string(),
            source: DownloadError::Cancelled,
        };
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_app_error_recoverability() {
        let timeout = AppError::Download(DownloadError::Timeout { seconds: 5 });
        assert!(timeout.is_recoverable());
        assert_eq!(timeout.category(), "download");

        let corrupt = AppError::Catalog(CatalogError::Corrupt {
            path: PathBuf::from("database.json"),
            reason: "expected value".to_string(),
        });
        assert!(!corrupt.is_recoverable());
        assert_eq!(corrupt.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_navigation_missing_pages_is_not_found() {
        let err = NavigationError::MissingPages {
            key: "haz_01-06-2024".to_string(),
            path: PathBuf::from("renderings/haz_01-06-2024/01_lo.png"),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorKind::NotFound.to_string(), "not-found");
    }
}
