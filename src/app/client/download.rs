//! Archive download with atomic writes and streaming
//!
//! The body is streamed chunk by chunk into `<name>.tmp` inside the downloads
//! directory and renamed to `<name>` only after the last byte was written.
//! Any failure removes the temporary file, so the downloads directory never
//! holds a partial archive under its final name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::cancel::CancellationFlag;
use crate::app::client::http::HttpHandler;
use crate::app::naming::ArchiveIdentity;
use crate::app::progress::{scaled, ProgressGate};
use crate::constants::{files, progress};
use crate::errors::{DownloadError, DownloadResult};

/// Archive download handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
    downloads_dir: &'a Path,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler writing into `downloads_dir`
    pub fn new(http_handler: &'a HttpHandler, downloads_dir: &'a Path) -> Self {
        Self {
            http_handler,
            downloads_dir,
        }
    }

    /// Downloads one archive to the downloads directory
    ///
    /// `progress` receives `floor(50 * written / content_length)` each time
    /// the value increases. Without a usable content length only the final
    /// 50 is reported. 50 is always the last value on success.
    ///
    /// # Arguments
    ///
    /// * `url` - Location of the archive
    /// * `identity` - Archive being downloaded, names the local file
    /// * `cancel` - Polled before the request and between chunks
    /// * `progress` - Receives download progress in `1..=50`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The request fails or the server answers with an error status
    /// - A chunk does not arrive within the read timeout
    /// - The body is shorter than the declared content length
    /// - The cancellation flag is set
    /// - File I/O operations fail
    pub async fn download<F>(
        &self,
        url: &Url,
        identity: &ArchiveIdentity,
        cancel: &CancellationFlag,
        mut progress: F,
    ) -> DownloadResult<PathBuf>
    where
        F: FnMut(u8),
    {
        tokio::fs::create_dir_all(self.downloads_dir).await?;

        let destination = self.downloads_dir.join(identity.filename());
        let temp_path = temp_path_for(&destination);

        let result = self
            .download_to_temp(url, &temp_path, cancel, &mut progress)
            .await;

        if let Err(e) = result {
            if tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
                if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                    warn!(
                        "Failed to remove partial download {}: {}",
                        temp_path.display(),
                        cleanup
                    );
                }
            }
            return Err(e);
        }

        tokio::fs::rename(&temp_path, &destination)
            .await
            .map_err(|_e| DownloadError::AtomicOperationFailed {
                temp_path: temp_path.clone(),
                final_path: destination.clone(),
            })?;

        info!(archive = %identity, "Downloaded {}", destination.display());
        Ok(destination)
    }

    async fn download_to_temp<F>(
        &self,
        url: &Url,
        temp_path: &Path,
        cancel: &CancellationFlag,
        progress: &mut F,
    ) -> DownloadResult<()>
    where
        F: FnMut(u8),
    {
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let read_timeout = self.http_handler.read_timeout();
        let response = tokio::time::timeout(read_timeout, self.http_handler.get_response(url))
            .await
            .map_err(|_| timeout_error(read_timeout))??;

        let content_length = response.content_length().filter(|len| *len > 0);
        debug!("Downloading {} ({:?} bytes)", url, content_length);

        let mut writer =
            BufWriter::with_capacity(files::WRITE_BUFFER_SIZE, File::create(temp_path).await?);
        let mut stream = response.bytes_stream();
        let mut gate = ProgressGate::default();
        let mut written: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }

            let chunk = match tokio::time::timeout(read_timeout, stream.next()).await {
                Ok(Some(chunk)) => chunk?,
                Ok(None) => break,
                Err(_) => return Err(timeout_error(read_timeout)),
            };

            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(value) =
                content_length.and_then(|len| scaled(progress::DOWNLOAD_SHARE, written, len))
            {
                if let Some(value) = gate.advance(value) {
                    progress(value);
                }
            }
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        if let Some(expected) = content_length {
            if written < expected {
                return Err(DownloadError::IncompleteDownload {
                    received: written,
                    expected,
                });
            }
        }

        if let Some(value) = gate.advance(progress::DOWNLOAD_SHARE) {
            progress(value);
        }
        Ok(())
    }
}

/// `<name>.tmp` next to the final file
fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

fn timeout_error(timeout: Duration) -> DownloadError {
    DownloadError::Timeout {
        seconds: timeout.as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;
    use crate::errors::ErrorKind;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn identity() -> ArchiveIdentity {
        ArchiveIdentity::new("haz", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).unwrap()
    }

    fn handler(config: ClientConfig) -> HttpHandler {
        HttpHandler::new(&config).unwrap()
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    /// Answer a single request with a raw HTTP response, then close
    async fn serve_raw_once(response: Vec<u8>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{}/haz_01-06-2024.zip", addr)).unwrap()
    }

    #[test]
    fn test_temp_file_path_generation() {
        let temp = temp_path_for(Path::new("/tmp/downloads/haz_01-06-2024.zip"));
        assert_eq!(temp, Path::new("/tmp/downloads/haz_01-06-2024.zip.tmp"));
    }

    #[tokio::test]
    async fn test_download_reports_monotonic_progress() {
        let server = MockServer::start_async().await;
        let body = vec![7u8; 200 * 1024];
        server
            .mock_async(|when, then| {
                when.method(GET).path("/haz_01-06-2024.zip");
                then.status(200).body(body.clone());
            })
            .await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default());
        let downloader = DownloadHandler::new(&http, temp_dir.path());
        let url = Url::parse(&server.url("/haz_01-06-2024.zip")).unwrap();

        let mut values = Vec::new();
        let path = downloader
            .download(&url, &identity(), &CancellationFlag::new(), |v| values.push(v))
            .await
            .unwrap();

        assert_eq!(path, temp_dir.path().join("haz_01-06-2024.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
        assert!(!temp_dir.path().join("haz_01-06-2024.zip.tmp").exists());

        assert_eq!(values.last(), Some(&50));
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert!(values.iter().all(|v| (1..=50).contains(v)));
    }

    #[tokio::test]
    async fn test_download_error_status_leaves_no_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/haz_01-06-2024.zip");
                then.status(500);
            })
            .await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default());
        let downloader = DownloadHandler::new(&http, temp_dir.path());
        let url = Url::parse(&server.url("/haz_01-06-2024.zip")).unwrap();

        let err = downloader
            .download(&url, &identity(), &CancellationFlag::new(), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_download_cancelled_before_start() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/haz_01-06-2024.zip");
                then.status(200).body("data");
            })
            .await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default());
        let downloader = DownloadHandler::new(&http, temp_dir.path());
        let url = Url::parse(&server.url("/haz_01-06-2024.zip")).unwrap();

        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = downloader
            .download(&url, &identity(), &cancel, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Cancelled));
        assert_eq!(mock.hits_async().await, 0);
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_download_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/haz_01-06-2024.zip");
                then.status(200)
                    .body("late")
                    .delay(Duration::from_millis(500));
            })
            .await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default().with_read_timeout(Duration::from_millis(50)));
        let downloader = DownloadHandler::new(&http, temp_dir.path());
        let url = Url::parse(&server.url("/haz_01-06-2024.zip")).unwrap();

        let err = downloader
            .download(&url, &identity(), &CancellationFlag::new(), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_download_without_length_reports_only_final_progress() {
        let mut response = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(&[3u8; 64 * 1024]);
        let url = serve_raw_once(response).await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default());
        let downloader = DownloadHandler::new(&http, temp_dir.path());

        let mut values = Vec::new();
        let path = downloader
            .download(&url, &identity(), &CancellationFlag::new(), |v| values.push(v))
            .await
            .unwrap();

        assert_eq!(values, [50]);
        assert_eq!(std::fs::read(&path).unwrap().len(), 64 * 1024);
    }

    #[tokio::test]
    async fn test_download_zero_length_reports_only_final_progress() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let url = serve_raw_once(response.to_vec()).await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default());
        let downloader = DownloadHandler::new(&http, temp_dir.path());

        let mut values = Vec::new();
        downloader
            .download(&url, &identity(), &CancellationFlag::new(), |v| values.push(v))
            .await
            .unwrap();

        assert_eq!(values, [50]);
    }

    #[tokio::test]
    async fn test_truncated_body_is_network_error_and_leaves_no_file() {
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(&[9u8; 1000]);
        let url = serve_raw_once(response).await;

        let temp_dir = TempDir::new().unwrap();
        let http = handler(ClientConfig::default());
        let downloader = DownloadHandler::new(&http, temp_dir.path());

        let err = downloader
            .download(&url, &identity(), &CancellationFlag::new(), |_| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[test]
    fn test_incomplete_download_is_network_error() {
        let err = DownloadError::IncompleteDownload {
            received: 1000,
            expected: 4096,
        };
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
