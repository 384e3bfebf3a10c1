//! Decryption and extraction of downloaded archives
//!
//! Every archive is an AES-encrypted zip whose password is derived from the
//! shared secret and the archive name (see [`derive_archive_password`]). All
//! members are unpacked into `renderings/<key>/`, the metadata file is read
//! from there, and the downloaded archive is removed.
//!
//! Extraction is blocking; async callers run it on `spawn_blocking`.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::app::cancel::CancellationFlag;
use crate::app::catalog::{ArchiveMetadata, CatalogEntry};
use crate::app::naming::ArchiveIdentity;
use crate::app::progress::{scaled, ProgressGate};
use crate::constants::{files, progress};
use crate::errors::{ExtractError, ExtractResult};

mod key;

#[cfg(test)]
pub(crate) mod fixtures;

pub use key::derive_archive_password;

/// Extracts encrypted archives into the renderings directory
#[derive(Clone)]
pub struct SecureExtractor {
    secret: String,
    renderings_dir: PathBuf,
}

impl fmt::Debug for SecureExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureExtractor")
            .field("secret", &"<redacted>")
            .field("renderings_dir", &self.renderings_dir)
            .finish()
    }
}

impl SecureExtractor {
    /// Create an extractor for the given shared secret
    pub fn new(secret: impl Into<String>, renderings_dir: impl Into<PathBuf>) -> Self {
        Self {
            secret: secret.into(),
            renderings_dir: renderings_dir.into(),
        }
    }

    /// Root directory receiving extracted entries
    pub fn renderings_dir(&self) -> &Path {
        &self.renderings_dir
    }

    /// Decrypt and unpack one archive
    ///
    /// `progress` receives `50 + floor(50 * done / total)` each time the
    /// value increases; the final member always reports 100. A directory
    /// left behind by an earlier interrupted run is replaced. The archive is
    /// removed whether or not extraction succeeds; on failure the partially
    /// extracted directory is removed too.
    ///
    /// # Arguments
    ///
    /// * `archive_path` - Downloaded archive
    /// * `identity` - Identity of the archive, selects password and target
    /// * `cancel` - Polled between members
    /// * `progress` - Receives extraction progress in `51..=100`
    ///
    /// # Errors
    ///
    /// Returns `ExtractError` if:
    /// - The derived password is rejected (crypto error)
    /// - The archive is malformed, empty or has a member escaping the target
    /// - The metadata file is missing or violates the entry invariants
    /// - The cancellation flag is set
    /// - File I/O operations fail
    pub fn extract<F>(
        &self,
        archive_path: &Path,
        identity: &ArchiveIdentity,
        cancel: &CancellationFlag,
        progress: F,
    ) -> ExtractResult<CatalogEntry>
    where
        F: FnMut(u8),
    {
        let key = identity.key();
        let target = self.renderings_dir.join(&key);

        if target.exists() {
            warn!("Replacing stale extraction directory {}", target.display());
            fs::remove_dir_all(&target)?;
        }
        fs::create_dir_all(&target)?;

        let password = derive_archive_password(&self.secret, &key);
        let result = unpack(archive_path, &target, &password, cancel, progress)
            .and_then(|()| read_metadata(&target));

        if let Err(e) = fs::remove_file(archive_path) {
            warn!(
                "Could not remove the archive {}: {}",
                archive_path.display(),
                e
            );
        }

        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&target) {
                    warn!(
                        "Failed to remove partial extraction {}: {}",
                        target.display(),
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        info!(
            archive = %identity,
            pages = entry.page_count,
            "Extracted to {}",
            target.display()
        );
        Ok(entry)
    }
}

fn unpack<F>(
    archive_path: &Path,
    target: &Path,
    password: &str,
    cancel: &CancellationFlag,
    mut progress: F,
) -> ExtractResult<()>
where
    F: FnMut(u8),
{
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| map_zip_error(archive_path, e))?;

    let total = archive.len();
    if total == 0 {
        return Err(ExtractError::Malformed {
            path: archive_path.to_path_buf(),
            reason: "archive has no members".to_string(),
        });
    }

    let mut gate = ProgressGate::starting_at(progress::DOWNLOAD_SHARE);

    for idx in 0..total {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let mut member = archive
            .by_index_decrypt(idx, password.as_bytes())
            .map_err(|e| map_zip_error(archive_path, e))?;

        let name = member.name().to_string();
        let relative = member
            .enclosed_name()
            .ok_or_else(|| ExtractError::UnsafeMember {
                path: archive_path.to_path_buf(),
                member: name.clone(),
            })?;
        let dest_path = target.join(relative);

        if member.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::with_capacity(files::WRITE_BUFFER_SIZE, File::create(&dest_path)?);
            io::copy(&mut member, &mut out).map_err(|e| {
                if e.kind() == io::ErrorKind::InvalidData {
                    ExtractError::Decryption {
                        path: archive_path.to_path_buf(),
                        member: name.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    ExtractError::Io(e)
                }
            })?;
            out.flush()?;
        }
        debug!("Extracted member {}", name);

        let done = (idx + 1) as u64;
        let value = progress::DOWNLOAD_SHARE
            + scaled(progress::DOWNLOAD_SHARE, done, total as u64).unwrap_or(0);
        if let Some(value) = gate.advance(value) {
            progress(value);
        }
    }

    Ok(())
}

fn read_metadata(target: &Path) -> ExtractResult<CatalogEntry> {
    let path = target.join(files::METADATA_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ExtractError::MissingMetadata { path })
        }
        Err(e) => return Err(ExtractError::Io(e)),
    };

    let metadata: ArchiveMetadata =
        serde_json::from_str(&content).map_err(|e| ExtractError::InvalidMetadata {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let entry = CatalogEntry::from_metadata(metadata);
    entry
        .validate()
        .map_err(|reason| ExtractError::InvalidMetadata { path, reason })?;
    Ok(entry)
}

fn map_zip_error(path: &Path, error: ZipError) -> ExtractError {
    match error {
        ZipError::InvalidPassword => ExtractError::InvalidPassword {
            path: path.to_path_buf(),
        },
        ZipError::UnsupportedArchive(detail) if detail.to_ascii_lowercase().contains("password") => {
            ExtractError::InvalidPassword {
                path: path.to_path_buf(),
            }
        }
        ZipError::Io(e) => ExtractError::Io(e),
        other => ExtractError::Malformed {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
