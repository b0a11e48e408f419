//! Page fetching
//!
//! The crawl loops never talk to the network directly. They hand a
//! [`FetchRequest`] to a [`PageFetcher`] and get back a [`FetchOutcome`]
//! whose only failure signal is `success == false`.
//!
//! [`HttpFetcher`] is the bundled implementation: a plain HTTP GET whose
//! readiness condition is evaluated against the returned HTML. A
//! headless-browser fetcher can be plugged in behind the same trait, using
//! [`ReadyCondition::to_script`] and [`SCROLL_SCRIPT`] for its page hooks.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Interaction script that scrolls to the bottom to trigger lazy content
pub const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// When a fetched page counts as loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyCondition {
    /// Any response body is accepted
    Immediate,

    /// More than this many anchors are present
    MoreAnchorsThan(usize),

    /// At least one of these CSS selectors matches
    AnySelector(Vec<String>),
}

impl ReadyCondition {
    /// Checks the condition against rendered HTML
    pub fn is_met(&self, html: &str) -> bool {
        match self {
            Self::Immediate => true,
            Self::MoreAnchorsThan(min) => {
                let Ok(selector) = Selector::parse("a") else {
                    return false;
                };
                Html::parse_document(html).select(&selector).count() > *min
            }
            Self::AnySelector(selectors) => {
                let document = Html::parse_document(html);
                selectors.iter().any(|css| {
                    Selector::parse(css)
                        .map(|selector| document.select(&selector).next().is_some())
                        .unwrap_or(false)
                })
            }
        }
    }

    /// Renders the condition as a JavaScript predicate for browser fetchers
    pub fn to_script(&self) -> String {
        match self {
            Self::Immediate => "() => true".to_string(),
            Self::MoreAnchorsThan(min) => format!(
                "() => document.querySelectorAll(\"a\").length > {}",
                min
            ),
            Self::AnySelector(selectors) => {
                let checks: Vec<String> = selectors
                    .iter()
                    .map(|css| format!("document.querySelector({:?}) !== null", css))
                    .collect();
                format!("() => {}", checks.join(" || "))
            }
        }
    }
}

/// A single page fetch
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub ready: ReadyCondition,
    /// Interaction script run once the page has loaded
    pub script: Option<String>,
    /// Ask every cache on the way to revalidate
    pub bypass_cache: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, ready: ReadyCondition) -> Self {
        Self {
            url: url.into(),
            ready,
            script: Some(SCROLL_SCRIPT.to_string()),
            bypass_cache: true,
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub success: bool,
    /// Rendered HTML (empty on failure)
    pub html: String,
    /// URL the page was finally served from
    pub url: String,
}

impl FetchOutcome {
    pub fn loaded(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            success: true,
            html: html.into(),
            url: url.into(),
        }
    }

    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            success: false,
            html: String::new(),
            url: url.into(),
        }
    }
}

/// Something that can turn a URL into rendered HTML
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page; failures are reported through `success`
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use reg_harvest::config::UserAgentConfig;
/// use reg_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "RegHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by plain HTTP requests
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn cache_headers(bypass: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if bypass {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }
        headers
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        if request.script.is_some() {
            tracing::trace!("HTTP fetcher ignores interaction script for {}", request.url);
        }

        let response = match self
            .client
            .get(&request.url)
            .headers(Self::cache_headers(request.bypass_cache))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!("Request timeout for {}", request.url);
                } else {
                    tracing::warn!("Request failed for {}: {}", request.url, e);
                }
                return FetchOutcome::failed(request.url);
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            tracing::warn!("HTTP {} for {}", status.as_u16(), request.url);
            return FetchOutcome::failed(final_url);
        }

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read body of {}: {}", request.url, e);
                return FetchOutcome::failed(final_url);
            }
        };

        if !request.ready.is_met(&html) {
            tracing::warn!(
                "Page {} never became ready ({})",
                request.url,
                request.ready.to_script()
            );
            return FetchOutcome::failed(final_url);
        }

        FetchOutcome::loaded(final_url, html)
    }
}
