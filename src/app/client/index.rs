//! Remote archive index
//!
//! The server publishes the names of all available archives as a JSON
//! document at the host URL itself:
//!
//! ```json
//! {"archives": ["haz_01-06-2024.zip", "haz_31-05-2024.zip"]}
//! ```

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::http::INDEX_FIELD;
use crate::errors::{DownloadError, DownloadResult};

/// Archive filenames in the order the server published them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    names: Vec<String>,
}

impl RemoteListing {
    /// Build a listing, collapsing duplicates (first occurrence wins)
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| seen.insert(name.clone()))
            .collect();
        Self { names }
    }

    /// Iterate over the archive names
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the listing is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct IndexDocument {
    archives: Vec<String>,
}

/// Fetches the published listing from the index endpoint
///
/// # Errors
///
/// Returns a network error on transport failure, `DownloadError::Timeout` if
/// the request exceeds its budget, `DownloadError::ServerError` on a
/// non-success status and `DownloadError::UnexpectedResponse` if the body is
/// not the expected document.
pub async fn fetch_listing(http: &HttpHandler, index_url: &Url) -> DownloadResult<RemoteListing> {
    debug!("Fetching archive index from {}", index_url);
    let body = http.get_page(index_url).await?;
    let listing = parse_index(&body).map_err(|reason| DownloadError::UnexpectedResponse {
        url: index_url.to_string(),
        reason,
    })?;

    info!(archives = listing.len(), "Fetched remote index");
    Ok(listing)
}

fn parse_index(body: &str) -> Result<RemoteListing, String> {
    let document: IndexDocument = serde_json::from_str(body)
        .map_err(|e| format!("expected an object with an '{}' list: {}", INDEX_FIELD, e))?;
    Ok(RemoteListing::new(document.archives))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;
    use crate::errors::ErrorKind;
    use httpmock::prelude::*;

    #[test]
    fn test_duplicates_collapse_in_order() {
        let listing = RemoteListing::new(["b.zip", "a.zip", "b.zip", "c.zip", "a.zip"]);
        assert_eq!(listing.iter().collect::<Vec<_>>(), ["b.zip", "a.zip", "c.zip"]);
    }

    #[test]
    fn test_parse_index_shapes() {
        let listing = parse_index(r#"{"archives": ["haz_01-06-2024.zip"], "other": 1}"#).unwrap();
        assert_eq!(listing.len(), 1);

        assert!(parse_index(r#"{"archives": "haz_01-06-2024.zip"}"#).is_err());
        assert!(parse_index(r#"{"files": []}"#).is_err());
        assert!(parse_index(r#"["haz_01-06-2024.zip"]"#).is_err());
        assert!(parse_index("<html></html>").is_err());
    }

    #[tokio::test]
    async fn test_fetch_listing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"archives": ["haz_01-06-2024.zip", "haz_31-05-2024.zip"]}"#);
            })
            .await;

        let http = HttpHandler::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&server.url("/")).unwrap();
        let listing = fetch_listing(&http, &url).await.unwrap();

        assert_eq!(
            listing.iter().collect::<Vec<_>>(),
            ["haz_01-06-2024.zip", "haz_31-05-2024.zip"]
        );
    }

    #[tokio::test]
    async fn test_fetch_listing_unexpected_shape() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(r#"{"archive": []}"#);
            })
            .await;

        let http = HttpHandler::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&server.url("/")).unwrap();
        let err = fetch_listing(&http, &url).await.unwrap_err();

        assert!(matches!(err, DownloadError::UnexpectedResponse { .. }));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
