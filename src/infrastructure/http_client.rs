//! HTTP client for fetching product pages and marketplace APIs
//!
//! Single-attempt GETs with a bounded timeout, a browser user agent and
//! redirect following. There is no cookie jar, so one resolution never sees
//! cookies set during another. Failures are logged and returned as
//! [`ParsingError`]; callers decide what an unavailable page means for them.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::infrastructure::config::{ParserConfig, defaults};
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Outbound retrieval used by the parsers
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body as text
    async fn fetch_html(&self, url: &str) -> ParsingResult<String>;

    /// Fetch and decode a JSON document
    async fn fetch_json(&self, url: &str) -> ParsingResult<serde_json::Value>;
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Whether to follow redirects
    pub follow_redirects: bool,
    /// Redirect hop limit when following
    pub max_redirects: usize,
}

impl HttpClientConfig {
    pub fn from_parser_config(parser_config: &ParserConfig) -> Self {
        Self {
            timeout_seconds: parser_config.request_timeout_seconds,
            user_agent: parser_config.user_agent.clone(),
            follow_redirects: parser_config.follow_redirects,
            max_redirects: parser_config.max_redirects,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            follow_redirects: true,
            max_redirects: defaults::MAX_REDIRECTS,
        }
    }
}

/// reqwest-backed [`PageFetcher`]; cheap to clone
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a client with default configuration
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn from_parser_config(parser_config: &ParserConfig) -> ParsingResult<Self> {
        Self::with_config(HttpClientConfig::from_parser_config(parser_config))
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> ParsingResult<Self> {
        if config.timeout_seconds == 0 {
            return Err(ParsingError::configuration(
                "timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| {
                ParsingError::configuration("http_client", &format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a URL and require a 2xx status
    pub async fn fetch_response(&self, url: &str) -> ParsingResult<Response> {
        info!("🌐 HTTP GET: {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("⚠️ Network error for {}: {}", url, e);
            ParsingError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("❌ HTTP error {}: {}", status, url);
            return Err(ParsingError::HttpRequestFailed {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        debug!("HTTP {} for {} (final URL: {})", status, url, response.url());
        Ok(response)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_html(&self, url: &str) -> ParsingResult<String> {
        let response = self.fetch_response(url).await?;

        let html_content = response.text().await.map_err(|e| {
            warn!("⚠️ Failed to read body from {}: {}", url, e);
            ParsingError::Network {
                url: url.to_string(),
                message: format!("failed to read response body: {e}"),
            }
        })?;

        if html_content.trim().is_empty() {
            warn!("Empty response from {}", url);
            return Err(ParsingError::EmptyResponse {
                url: url.to_string(),
            });
        }

        debug!("Fetched {} bytes from {}", html_content.len(), url);
        Ok(html_content)
    }

    async fn fetch_json(&self, url: &str) -> ParsingResult<serde_json::Value> {
        let response = self.fetch_response(url).await?;

        response.json::<serde_json::Value>().await.map_err(|e| {
            warn!("⚠️ Invalid JSON from {}: {}", url, e);
            ParsingError::InvalidJson {
                url: url.to_string(),
                message: e.to_string(),
            }
        })
    }
}
