//! Durable storage for the catalog document
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the catalog file, so a crash mid-write never leaves a truncated
//! document behind.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{CatalogError, CatalogResult};

use super::types::CatalogState;

/// Load the catalog document, creating an empty one if none exists
///
/// # Errors
///
/// Returns `CatalogError::Corrupt` if the file exists but does not hold a
/// well-formed catalog document, or `CatalogError::Io` on filesystem failure.
pub fn load_or_create(path: &Path) -> CatalogResult<CatalogState> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No catalog at {}, creating an empty one", path.display());
            let state = CatalogState::default();
            write_atomic(path, &state)?;
            return Ok(state);
        }
        Err(source) => {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let state: CatalogState =
        serde_json::from_str(&content).map_err(|e| CatalogError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(
        "Loaded catalog from {} ({} entries, {} bookmarks)",
        path.display(),
        state.newspaper.len(),
        state.bookmark.len()
    );
    Ok(state)
}

/// Serialize the whole document and atomically replace the catalog file
pub fn write_atomic(path: &Path, state: &CatalogState) -> CatalogResult<()> {
    let io_err = |source: std::io::Error| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer(&mut writer, state)?;
        writer.flush().map_err(io_err)?;
    }
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("Catalog persisted to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.json");

        let state = load_or_create(&path).unwrap();
        assert_eq!(state, CatalogState::default());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({"bookmark": {}, "newspaper": {}}));
    }

    #[test]
    fn test_corrupt_document_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.json");
        fs::write(&path, "{\"bookmark\": {}, \"newspaper\": ").unwrap();

        let result = load_or_create(&path);
        assert!(matches!(result, Err(CatalogError::Corrupt { .. })));

        // The corrupt file is left untouched for inspection
        assert!(fs::read_to_string(&path).unwrap().ends_with(": "));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("database.json");

        write_atomic(&path, &CatalogState::default()).unwrap();
        assert!(path.exists());
        assert_eq!(load_or_create(&path).unwrap(), CatalogState::default());
    }
}
