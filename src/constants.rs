//! Application constants for Paper Kiosk
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for credentials
pub mod env {
    /// Environment variable overriding the archive host URL
    pub const ARCHIVE_HOST: &str = "PAPER_KIOSK_HOST";

    /// Environment variable overriding the shared archive secret
    pub const ARCHIVE_KEY: &str = "PAPER_KIOSK_ARCHIVE_KEY";
}

/// Credential storage constants
pub mod auth {
    /// Dotenv file written by `auth setup`
    pub const ENV_FILE: &str = ".env";

    /// File permissions for .env file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const ENV_FILE_PERMISSIONS: u32 = 0o600;
}

/// Archive naming scheme
pub mod naming {
    /// Separator between source and date in a key
    pub const SEPARATOR: char = '_';

    /// Date format used in keys and filenames
    pub const DATE_FORMAT: &str = "%d-%m-%Y";

    /// Extension of archives published by the server
    pub const ARCHIVE_EXTENSION: &str = ".zip";

    /// Date format used in page labels
    pub const LABEL_DATE_FORMAT: &str = "%d.%m.%Y";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Paper-Kiosk/0.1.0";

    /// Default timeout for the index request
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Maximum time to wait for a single body chunk
    pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Field of the index document holding the archive names
    pub const INDEX_FIELD: &str = "archives";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Default catalog file name
    pub const CATALOG_FILE: &str = "database.json";

    /// Directory receiving downloaded archives
    pub const DOWNLOADS_DIR: &str = "downloads";

    /// Directory receiving extracted page assets
    pub const RENDERINGS_DIR: &str = "renderings";

    /// Metadata file shipped inside every archive
    pub const METADATA_FILE: &str = "info.json";

    /// Suffix of low resolution page images
    pub const LOW_RES_SUFFIX: &str = "_lo.png";

    /// Suffix of high resolution page images
    pub const HIGH_RES_SUFFIX: &str = "_hi.png";

    /// Buffer size used when writing downloads and extracted members
    pub const WRITE_BUFFER_SIZE: usize = 64 * 1024;
}

/// Progress reporting constants
pub mod progress {
    /// Share of an archive's progress attributed to the download phase
    pub const DOWNLOAD_SHARE: u8 = 50;

    /// Final progress value
    pub const COMPLETE: u8 = 100;
}

/// Synchronization defaults
pub mod sync {
    /// Archives older than this many days are not downloaded
    pub const DEFAULT_RETENTION_DAYS: i64 = 1;

    /// Entries older than this many days are pruned (0 disables pruning)
    pub const DEFAULT_KEEP_DAYS: i64 = 0;
}
