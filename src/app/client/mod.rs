//! HTTP client for the archive server
//!
//! The archive server is a plain HTTP host: the host URL itself serves the
//! index document and every archive is published next to it under its
//! filename.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations
//! - `index`: Remote listing retrieval
//! - `download`: Archive download with atomic writes

use std::path::{Path, PathBuf};

use url::Url;

use crate::app::cancel::CancellationFlag;
use crate::app::naming::ArchiveIdentity;
use crate::errors::{DownloadError, DownloadResult};

pub mod config;
pub mod download;
pub mod http;
pub mod index;

pub use config::ClientConfig;
pub use index::RemoteListing;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for one archive host
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http_handler: HttpHandler,
    host: Url,
    downloads_dir: PathBuf,
}

impl ArchiveClient {
    /// Creates a client for `host`, downloading into `downloads_dir`
    ///
    /// A trailing slash is added to the host if missing, so archive names
    /// resolve below it rather than replacing its last path segment.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` if the host is not an absolute
    /// URL, or `DownloadError::Http` if the HTTP client cannot be built.
    pub fn new(
        host: &str,
        config: &ClientConfig,
        downloads_dir: impl Into<PathBuf>,
    ) -> DownloadResult<Self> {
        let normalized = if host.ends_with('/') {
            host.to_string()
        } else {
            format!("{}/", host)
        };
        let host = Url::parse(&normalized).map_err(|e| DownloadError::InvalidUrl {
            url: normalized.clone(),
            error: e.to_string(),
        })?;

        tracing::debug!("Created archive client for {}", host);

        Ok(Self {
            http_handler: HttpHandler::new(config)?,
            host,
            downloads_dir: downloads_dir.into(),
        })
    }

    /// Fetches the published archive listing
    ///
    /// # Errors
    ///
    /// See [`index::fetch_listing`].
    pub async fn fetch_listing(&self) -> DownloadResult<RemoteListing> {
        index::fetch_listing(&self.http_handler, &self.host).await
    }

    /// Location of an archive on the server
    pub fn archive_url(&self, identity: &ArchiveIdentity) -> DownloadResult<Url> {
        let filename = identity.filename();
        self.host
            .join(&filename)
            .map_err(|e| DownloadError::InvalidUrl {
                url: format!("{}{}", self.host, filename),
                error: e.to_string(),
            })
    }

    /// Downloads one archive, returning its local path
    ///
    /// # Errors
    ///
    /// See [`DownloadHandler::download`].
    pub async fn download<F>(
        &self,
        identity: &ArchiveIdentity,
        cancel: &CancellationFlag,
        progress: F,
    ) -> DownloadResult<PathBuf>
    where
        F: FnMut(u8),
    {
        let url = self.archive_url(identity)?;
        DownloadHandler::new(&self.http_handler, &self.downloads_dir)
            .download(&url, identity, cancel, progress)
            .await
    }

    /// Get the host URL, which also serves the index
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Directory receiving downloaded archives
    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn identity() -> ArchiveIdentity {
        ArchiveIdentity::new("haz", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).unwrap()
    }

    #[test]
    fn test_archive_url_resolves_below_host() {
        for host in ["http://archive.local/papers", "http://archive.local/papers/"] {
            let client = ArchiveClient::new(host, &ClientConfig::default(), "downloads").unwrap();
            assert_eq!(client.host().as_str(), "http://archive.local/papers/");
            assert_eq!(
                client.archive_url(&identity()).unwrap().as_str(),
                "http://archive.local/papers/haz_01-06-2024.zip"
            );
        }
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let result = ArchiveClient::new("not a url", &ClientConfig::default(), "downloads");
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
