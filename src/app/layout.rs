//! On-disk storage layout
//!
//! ```text
//! <root>/
//! ├── database.json
//! ├── downloads/<source>_<DD-MM-YYYY>.zip
//! └── renderings/<source>_<DD-MM-YYYY>/
//!     ├── info.json
//!     ├── 01_lo.png
//!     └── 01_hi.png
//! ```

use std::path::{Path, PathBuf};

use crate::app::naming::ArchiveIdentity;
use crate::constants::files;

/// Resolves every path the engine reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    downloads: PathBuf,
    renderings: PathBuf,
    catalog: PathBuf,
}

impl StorageLayout {
    /// Standard layout below a single root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            downloads: root.join(files::DOWNLOADS_DIR),
            renderings: root.join(files::RENDERINGS_DIR),
            catalog: root.join(files::CATALOG_FILE),
        }
    }

    /// Layout with each location chosen explicitly
    pub fn with_paths(
        downloads: impl Into<PathBuf>,
        renderings: impl Into<PathBuf>,
        catalog: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloads: downloads.into(),
            renderings: renderings.into(),
            catalog: catalog.into(),
        }
    }

    /// Directory receiving downloaded archives
    pub fn downloads_dir(&self) -> &Path {
        &self.downloads
    }

    /// Root of the extracted page assets
    pub fn renderings_dir(&self) -> &Path {
        &self.renderings
    }

    /// Durable catalog file
    pub fn catalog_file(&self) -> &Path {
        &self.catalog
    }

    /// Final location of a downloaded archive
    pub fn archive_path(&self, identity: &ArchiveIdentity) -> PathBuf {
        self.downloads.join(identity.filename())
    }

    /// Extraction directory of an entry
    pub fn entry_dir(&self, key: &str) -> PathBuf {
        self.renderings.join(key)
    }

    /// Low and high resolution images of one page
    pub fn page_images(&self, key: &str, page: u32) -> (PathBuf, PathBuf) {
        let dir = self.entry_dir(key);
        (
            dir.join(format!("{:02}{}", page, files::LOW_RES_SUFFIX)),
            dir.join(format!("{:02}{}", page, files::HIGH_RES_SUFFIX)),
        )
    }
}
