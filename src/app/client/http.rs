//! Core HTTP operations
//!
//! Single-shot requests against the archive server. Nothing here retries:
//! a failed request is reported to the caller, which decides whether the
//! whole sync is attempted again later.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::errors::{DownloadError, DownloadResult};

/// HTTP operations handler
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
    request_timeout: Duration,
    read_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler from a client configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Http` if the underlying client cannot be built
    pub fn new(config: &ClientConfig) -> DownloadResult<Self> {
        Ok(Self {
            client: config.build_http_client()?,
            request_timeout: config.request_timeout,
            read_timeout: config.read_timeout,
        })
    }

    /// Sends a GET request and checks the status
    ///
    /// The body is not read; callers stream it and bound each chunk with
    /// [`HttpHandler::read_timeout`].
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ServerError` for a non-success status, or
    /// `DownloadError::Http` if the request could not be sent.
    pub async fn get_response(&self, url: &Url) -> DownloadResult<Response> {
        let response = self.client.get(url.as_str()).send().await?;
        check_status(response, url)
    }

    /// Fetches a complete text body within the request timeout
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Timeout` if the request and body together take
    /// longer than the configured request timeout.
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;
        let response = check_status(response, url)?;

        let text = response.text().await.map_err(|e| self.map_timeout(e))?;
        debug!("Fetched {} bytes from {}", text.len(), url);
        Ok(text)
    }

    /// Maximum wait for a single body chunk
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn map_timeout(&self, error: reqwest::Error) -> DownloadError {
        if error.is_timeout() {
            DownloadError::Timeout {
                seconds: self.request_timeout.as_secs(),
            }
        } else {
            DownloadError::Http(error)
        }
    }
}

fn check_status(response: Response, url: &Url) -> DownloadResult<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::ServerError {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response)
}
