use crate::books_api::errors::BooksApiError;
use crate::books_api::types::{Volume, parse_volumes};
use core::time::Duration;
use log::{info, warn};
use reqwest::{ClientBuilder, header};
use urlencoding::encode;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1/";
pub const DEFAULT_MAX_RESULTS: u8 = 20;

/// The remote search boundary. A search is a read-only, idempotent call; there is no retry.
#[async_trait::async_trait]
pub trait BookSearch: Send + Sync {
    /// Searches the catalog for `query`
    async fn search(&self, query: &str) -> Result<Vec<Volume>, BooksApiError>;
}

/// Connection settings for `GoogleBooksClient`
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleBooksConfig {
    /// Base URL of the API, ending in a slash
    pub base_url: String,
    /// Value of the `maxResults` query parameter
    pub max_results: u8,
    /// Optional two-letter language code sent as `langRestrict`
    pub lang_restrict: Option<String>,
}

impl Default for GoogleBooksConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            max_results: DEFAULT_MAX_RESULTS,
            lang_restrict: None,
        }
    }
}

impl GoogleBooksConfig {
    #[inline]
    #[must_use]
    pub fn new(base_url: String, max_results: u8, lang_restrict: Option<String>) -> Self {
        Self {
            base_url,
            max_results,
            lang_restrict,
        }
    }

    /// The full request URL for a volume search
    #[inline]
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let separator = if self.base_url.ends_with('/') { "" } else { "/" };
        let mut url = format!(
            "{}{separator}volumes?q={}&maxResults={}",
            self.base_url,
            encode(query),
            self.max_results
        );
        if let Some(lang) = self.lang_restrict.as_deref() {
            url.push_str("&langRestrict=");
            url.push_str(&encode(lang));
        }
        url
    }
}

pub struct GoogleBooksClient {
    /// A HTTP client used to execute all GET requests against the volumes endpoint
    http_client: reqwest::Client,
    config: GoogleBooksConfig,
}

impl GoogleBooksClient {
    /// Create a new HTTP request client, to be used for all subsequent searches
    /// # Errors
    /// Fails in case any of the reqwest `ClientBuilder` methods fail
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per program run"
    )]
    pub fn new(config: GoogleBooksConfig) -> Result<Self, BooksApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let client = ClientBuilder::new()
            .user_agent(concat!("readlog/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(25))
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(Duration::from_secs(30))
            .build();

        client
            .map(|http_client| Self {
                http_client,
                config,
            })
            .map_err(|err| {
                BooksApiError::Client(format!(
                    "Failed to create HTTP request client for book search: {err}"
                ))
            })
    }
}

#[async_trait::async_trait]
impl BookSearch for GoogleBooksClient {
    async fn search(&self, query: &str) -> Result<Vec<Volume>, BooksApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.config.search_url(query);
        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Book search for '{query}' failed with status {status}");
            return Err(BooksApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let volumes = parse_volumes(&body)?;
        info!("Book search for '{query}' returned {} volumes", volumes.len());
        Ok(volumes)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn search_url_encodes_query() {
        let config = GoogleBooksConfig::default();
        assert_eq!(
            config.search_url("Frank Herbert & Dune"),
            "https://www.googleapis.com/books/v1/volumes?q=Frank%20Herbert%20%26%20Dune&maxResults=20"
        );
    }

    #[test]
    fn search_url_with_language_and_bare_base() {
        let config = GoogleBooksConfig::new(
            "http://localhost:8080/books/v1".to_owned(),
            5,
            Some("ja".to_owned()),
        );
        assert_eq!(
            config.search_url("dune"),
            "http://localhost:8080/books/v1/volumes?q=dune&maxResults=5&langRestrict=ja"
        );
    }

    #[tokio::test]
    async fn blank_query_does_not_hit_the_network() {
        // port 9 (discard) would make any real request fail
        let config = GoogleBooksConfig::new("http://127.0.0.1:9/".to_owned(), 20, None);
        let client = GoogleBooksClient::new(config).unwrap();
        assert!(client.search("   ").await.unwrap().is_empty());
    }
}
