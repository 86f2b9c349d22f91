//! Best-effort page details for wish links.
//!
//! Pages are fetched through a public CORS proxy, with a second proxy tried
//! when the first one fails or returns an error page. Metadata is cosmetic:
//! a failed fetch never surfaces as an error. Callers get a minimal record
//! built from the URL itself and the failure is logged.
//!
//! Only an unparseable URL is rejected, before any request is made.

mod cache;
mod extractor;

pub use cache::MetadataCache;
pub use extractor::HtmlExtractor;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use thiserror::Error;
use tokio::task::{AbortHandle, JoinHandle};

use crate::models::UrlMetadata;

pub const DEFAULT_PROXY_URL: &str = "https://api.codetabs.com/v1/proxy?quest=";
pub const DEFAULT_FALLBACK_PROXY_URL: &str = "https://corsproxy.io/?";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;

/// Bodies shorter than this are treated as a failed fetch.
const MIN_PAGE_LEN: usize = 100;

const BOT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Christmas Gift Exchange Bot)";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Hosts and path fragments that suggest a shop page.
const PRODUCT_INDICATORS: &[&str] = &[
    "amazon.com",
    "ebay.com",
    "etsy.com",
    "target.com",
    "walmart.com",
    "bestbuy.com",
    "apple.com",
    "nike.com",
    "adidas.com",
    "zalando",
    "/product/",
    "/item/",
    "/p/",
    "/dp/",
    "/buy/",
    "/shop/",
    "product",
    "item",
    "buy",
    "shop",
    "store",
];

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid URL provided: {0}")]
    InvalidUrl(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Proxy returned status {0}")]
    Status(u16),
    #[error("Could not fetch page content")]
    EmptyPage,
    #[error("Metadata fetcher setup failed: {0}")]
    Setup(String),
    #[error("Metadata task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for MetadataError {
    fn from(e: reqwest::Error) -> Self {
        MetadataError::Http(e.to_string())
    }
}

/// Proxy endpoints, timeout and cache bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataOptions {
    /// Prefix the urlencoded page URL is appended to.
    pub proxy_url: String,
    pub fallback_proxy_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            fallback_proxy_url: DEFAULT_FALLBACK_PROXY_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Fetches and caches page metadata. Cheap to clone; clones share the cache.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: reqwest::Client,
    options: MetadataOptions,
    extractor: Arc<HtmlExtractor>,
    cache: Arc<Mutex<MetadataCache>>,
}

impl MetadataFetcher {
    pub fn new(options: MetadataOptions) -> Result<Self, MetadataError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(BOT_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| MetadataError::Setup(e.to_string()))?;
        let extractor = HtmlExtractor::new().map_err(|e| MetadataError::Setup(e.to_string()))?;
        let cache = MetadataCache::new(options.cache_ttl, options.cache_max_entries);

        Ok(Self {
            client,
            options,
            extractor: Arc::new(extractor),
            cache: Arc::new(Mutex::new(cache)),
        })
    }

    /// Returns metadata for `url`.
    ///
    /// Fails only for an invalid URL. Fetch or extraction problems yield
    /// [`fallback`] metadata.
    pub async fn fetch(&self, url: &str) -> Result<UrlMetadata, MetadataError> {
        validate(url)?;

        let cached = self.cache().get(url);
        if let Some(cached) = cached {
            tracing::debug!("Metadata cache hit for {}", url);
            return Ok(cached);
        }

        match self.fetch_page(url).await {
            Ok(html) => {
                let metadata = self.extractor.extract(&html, url);
                self.cache().insert(url.to_string(), metadata.clone());
                Ok(metadata)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch metadata for {}: {}", url, e);
                Ok(fallback(url))
            }
        }
    }

    /// Starts [`fetch`](Self::fetch) on the runtime.
    pub fn spawn(&self, url: impl Into<String>) -> MetadataTask {
        let fetcher = self.clone();
        let url = url.into();
        MetadataTask {
            handle: tokio::spawn(async move { fetcher.fetch(&url).await }),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<String, MetadataError> {
        let encoded = urlencoding::encode(url);

        let primary = format!("{}{}", self.options.proxy_url, encoded);
        let html = match self.get_text(&primary).await {
            Ok(body) if usable(&body) => body,
            Ok(_) => {
                tracing::debug!("Primary proxy returned an error page for {}", url);
                self.fallback_page(&encoded).await?
            }
            Err(e) => {
                tracing::debug!("Primary proxy failed for {}: {}", url, e);
                self.fallback_page(&encoded).await?
            }
        };

        if html.len() < MIN_PAGE_LEN {
            return Err(MetadataError::EmptyPage);
        }
        Ok(html)
    }

    async fn fallback_page(&self, encoded: &str) -> Result<String, MetadataError> {
        let fallback = format!("{}{}", self.options.fallback_proxy_url, encoded);
        self.get_text(&fallback).await
    }

    async fn get_text(&self, url: &str) -> Result<String, MetadataError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, MetadataCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A metadata fetch running in the background.
#[derive(Debug)]
pub struct MetadataTask {
    handle: JoinHandle<Result<UrlMetadata, MetadataError>>,
}

impl MetadataTask {
    /// Aborts the fetch. Its result is discarded.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Handle that cancels the fetch even after [`join`](Self::join) took
    /// ownership of the task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Waits for the result; `None` if the task was cancelled.
    pub async fn join(self) -> Option<Result<UrlMetadata, MetadataError>> {
        match self.handle.await {
            Ok(result) => Some(result),
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(Err(MetadataError::Task(e.to_string()))),
        }
    }
}

/// Checks that `url` is an absolute http(s) URL with a host.
pub fn validate(url: &str) -> Result<(), MetadataError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(())
        }
        _ => Err(MetadataError::InvalidUrl(url.to_string())),
    }
}

/// Minimal metadata derived from the URL alone.
pub fn fallback(url: &str) -> UrlMetadata {
    UrlMetadata {
        title: Some(url.to_string()),
        site_name: extractor::hostname(url),
        kind: Some("website".to_string()),
        ..Default::default()
    }
}

/// Whether `url` looks like a shop product page.
pub fn is_product_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    PRODUCT_INDICATORS.iter().any(|i| lower.contains(i))
}

/// A proxy body worth parsing: long enough and not an error page.
fn usable(body: &str) -> bool {
    body.len() >= MIN_PAGE_LEN && !body.contains("error")
}
