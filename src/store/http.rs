//! REST client for a remote document endpoint.
//!
//! Works against two kinds of servers:
//! - a hosted JSON bin, which authenticates with a custom secret header,
//!   wraps responses in `{"record": ...}` unless `X-BIN-META: false` is sent,
//!   and offers no version tokens;
//! - `giftswap-server`, which authenticates with a bearer token and exposes
//!   the document version as an `ETag`.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::StatusCode;

use super::{DocumentStore, Snapshot, StoreError, Version};
use crate::models::ExchangeDocument;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Document store reached over HTTP GET/PUT.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    url: String,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpDocumentStore {
    /// Creates a client that sends `api_key` as a bearer token.
    pub fn new(url: impl Into<String>, api_key: Option<&str>) -> Result<Self, StoreError> {
        Self::with_options(url, api_key, None, DEFAULT_TIMEOUT)
    }

    /// Creates a client with full control over authentication and timeout.
    ///
    /// With `auth_header` set, `api_key` is sent verbatim under that header
    /// name instead of `Authorization: Bearer <key>`.
    pub fn with_options(
        url: impl Into<String>,
        api_key: Option<&str>,
        auth_header: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let url = url.into();
        reqwest::Url::parse(&url).map_err(|e| StoreError::Http(format!("invalid store url: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-bin-meta", HeaderValue::from_static("false"));

        if let Some(key) = api_key {
            let (name, value) = match auth_header {
                Some(name) => (
                    HeaderName::from_bytes(name.as_bytes())
                        .map_err(|e| StoreError::Http(format!("invalid auth header: {e}")))?,
                    key.to_string(),
                ),
                None => (reqwest::header::AUTHORIZATION, format!("Bearer {}", key)),
            };
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| StoreError::Http(format!("invalid api key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::from)?;

        Ok(Self {
            url,
            client,
            headers,
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn into_snapshot(response: reqwest::Response) -> Result<Snapshot, StoreError> {
        let version = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .and_then(Version::from_etag);

        let body = response.text().await?;
        let document = parse_document(&body)?;

        Ok(Snapshot { document, version })
    }
}

impl DocumentStore for HttpDocumentStore {
    async fn fetch(&self) -> Result<Snapshot, StoreError> {
        tracing::debug!("GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let response = check_status(response, None).await?;
        Self::into_snapshot(response).await
    }

    async fn replace(
        &self,
        document: &ExchangeDocument,
        expected: Option<&Version>,
    ) -> Result<Snapshot, StoreError> {
        tracing::debug!("PUT {} (if-match: {:?})", self.url, expected);

        let mut request = self
            .client
            .put(&self.url)
            .headers(self.headers.clone())
            .body(serde_json::to_vec(document)?);

        if let Some(version) = expected {
            request = request.header(IF_MATCH, version.to_etag());
        }

        let response = check_status(request.send().await?, expected).await?;
        let version = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .and_then(Version::from_etag);

        // Some stores answer a PUT with an empty body.
        let body = response.text().await?;
        let document = if body.trim().is_empty() {
            document.clone()
        } else {
            parse_document(&body)?
        };

        Ok(Snapshot { document, version })
    }
}

async fn check_status(
    response: reqwest::Response,
    expected: Option<&Version>,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::PRECONDITION_FAILED {
        if let Some(expected) = expected {
            return Err(StoreError::Conflict {
                expected: expected.to_string(),
            });
        }
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Parses a document body, unwrapping a `{"record": ...}` envelope.
fn parse_document(body: &str) -> Result<ExchangeDocument, StoreError> {
    let mut value: serde_json::Value = serde_json::from_str(body)?;
    if let Some(record) = value.get_mut("record") {
        value = record.take();
    }
    Ok(serde_json::from_value(value)?)
}
