//! HTTP fetcher implementation
//!
//! This module handles all page fetches for the crawler, including:
//! - The `PageFetcher` seam the coordinator fetches through
//! - Building HTTP clients with the configured user agent, timeouts and proxy
//! - Classifying responses into a `FetchResult`

use crate::config::FetchConfig;
use crate::extract::RevealAction;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use std::time::Duration;

/// Maximum redirect hops followed per request
const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Non-success HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Returns true for a fetched HTML page
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// URL the page was finally served from, if the fetch succeeded
    pub fn final_url(&self) -> Option<&str> {
        match self {
            Self::Success { final_url, .. } => Some(final_url),
            _ => None,
        }
    }

    /// The page markup, if the fetch succeeded
    pub fn into_markup(self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// One-line description of a failed fetch, for logs
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { content_type } => {
                Some(format!("expected HTML, got {}", content_type))
            }
            Self::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::NetworkError { error } => Some(error.clone()),
        }
    }
}

/// The transport the coordinator fetches pages through
///
/// Implementations decide how a page is obtained; the crawler only sees the
/// markup and whether the fetch succeeded.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a page
    async fn fetch(&self, url: &str) -> FetchResult;

    /// Performs a UI action on the page (e.g. opening a tab) and returns the
    /// markup afterwards
    ///
    /// Transports without a live page return None, which the caller treats
    /// as "nothing revealed".
    async fn reveal(&self, _url: &str, _action: &RevealAction) -> Option<String> {
        None
    }

    /// Returns true if fetched markup is a rendered DOM rather than the raw
    /// server response
    fn renders_dom(&self) -> bool {
        false
    }
}

/// Builds an HTTP client with the configured transport settings
///
/// # Arguments
///
/// * `config` - User agent, timeouts and optional proxy
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. a bad proxy URL)
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::FetchConfig;
/// use catalog_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Fetches pages over plain HTTP
///
/// The markup is the raw server response, so script-populated listings are
/// not visible and no UI actions are possible.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        fetch_url(&self.client, url).await
    }
}

/// Fetches a URL and classifies the response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML or no Content-Type | Success |
/// | 2xx with another Content-Type | ContentMismatch |
/// | Any other status | HttpError |
/// | Timeout, connection or body error | NetworkError |
///
/// Nothing is retried.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_send_error(e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited by {}", url);
        }
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(content_type) = content_type {
        if !is_html(&content_type) {
            return FetchResult::ContentMismatch { content_type };
        }
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: format!("Failed to read body: {}", e),
        },
    }
}

fn is_html(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}

fn classify_send_error(e: reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_redirect() {
        format!("Redirect error: {}", e)
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
