//! HTTP routes for the document-store server.
//!
//! - `GET /health`: health check (no auth)
//! - `GET /document`: current document, version in `ETag`
//! - `PUT /document`: replace the document; honours `If-Match`

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use super::storage::FileDocumentStore;
use crate::models::ExchangeDocument;
use crate::store::{DocumentStore, Snapshot, StoreError, Version};

/// API key entry in the server config file.
#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    #[serde(default)]
    label: Option<String>,
}

/// Server config file structure.
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Accepted API keys, mapped to a label used in logs.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<String, String>,
}

impl ApiKeys {
    /// Loads API keys from the YAML config file.
    ///
    /// A missing or unparsable file yields an empty key set; every
    /// authenticated request is then refused.
    pub fn load(config_path: &Path) -> Self {
        let keys = match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<ConfigFile>(&contents) {
                Ok(config) => config
                    .api_keys
                    .into_iter()
                    .map(|entry| {
                        let label = entry.label.unwrap_or_else(|| "client".to_string());
                        (entry.key, label)
                    })
                    .collect::<HashMap<_, _>>(),
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                HashMap::new()
            }
        };

        if keys.is_empty() {
            tracing::warn!("No API keys loaded - all document requests will fail");
        } else {
            tracing::info!("Loaded {} API key(s)", keys.len());
        }

        Self { keys }
    }

    /// Builds a key set from `(key, label)` pairs.
    pub fn from_keys<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            keys: pairs
                .into_iter()
                .map(|(k, l)| (k.to_string(), l.to_string()))
                .collect(),
        }
    }

    /// Validates a key and returns its label.
    pub fn validate(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<ApiKeys>,
    pub store: Arc<FileDocumentStore>,
}

/// Label of the authenticated client, added to request extensions.
#[derive(Debug, Clone)]
pub struct ClientLabel(pub String);

/// Error body returned by every failing endpoint.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authorization header required")]
    MissingAuth,
    #[error("Authorization header must use Bearer scheme")]
    InvalidAuth,
    #[error("Invalid API key")]
    InvalidKey,
    #[error("Document changed since version {0}")]
    VersionConflict(String),
    #[error("Malformed If-Match header")]
    InvalidPrecondition,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::MissingAuth => (StatusCode::UNAUTHORIZED, "missing_auth"),
            ApiError::InvalidAuth => (StatusCode::UNAUTHORIZED, "invalid_auth"),
            ApiError::InvalidKey => (StatusCode::UNAUTHORIZED, "invalid_key"),
            ApiError::VersionConflict(_) => (StatusCode::PRECONDITION_FAILED, "version_conflict"),
            ApiError::InvalidPrecondition => (StatusCode::BAD_REQUEST, "invalid_precondition"),
            ApiError::Store(e) => {
                tracing::error!("Store failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
        };

        (
            status,
            Json(ErrorBody {
                error,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Authentication middleware.
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::MissingAuth)?;

    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidAuth)?;

    let label = state
        .api_keys
        .validate(api_key)
        .ok_or(ApiError::InvalidKey)?
        .to_string();

    request.extensions_mut().insert(ClientLabel(label));
    Ok(next.run(request).await)
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn document_response(snapshot: Snapshot) -> Response {
    let mut response = Json(snapshot.document).into_response();
    if let Some(etag) = snapshot
        .version
        .and_then(|v| HeaderValue::from_str(&v.to_etag()).ok())
    {
        response.headers_mut().insert(header::ETAG, etag);
    }
    response
}

async fn get_document(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.store.fetch().await?;
    Ok(document_response(snapshot))
}

async fn put_document(
    State(state): State<AppState>,
    axum::Extension(client): axum::Extension<ClientLabel>,
    headers: HeaderMap,
    Json(document): Json<ExchangeDocument>,
) -> Result<Response, ApiError> {
    let expected = match headers.get(header::IF_MATCH) {
        Some(value) => {
            let value = value.to_str().map_err(|_| ApiError::InvalidPrecondition)?;
            Some(Version::from_etag(value).ok_or(ApiError::InvalidPrecondition)?)
        }
        None => None,
    };

    let snapshot = match state.store.replace(&document, expected.as_ref()).await {
        Ok(snapshot) => snapshot,
        Err(StoreError::Conflict { expected }) => return Err(ApiError::VersionConflict(expected)),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Document replaced by {} (version {:?})",
        client.0,
        snapshot.version.as_ref().map(Version::as_str)
    );
    Ok(document_response(snapshot))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/document", get(get_document).put(put_document))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state(temp_dir: &TempDir) -> AppState {
        AppState {
            api_keys: Arc::new(ApiKeys::from_keys([("secret", "tests")])),
            store: Arc::new(FileDocumentStore::new(temp_dir.path())),
        }
    }

    fn request(method: &str, auth: Option<&str>) -> axum::http::request::Builder {
        let mut builder = HttpRequest::builder().method(method).uri("/document");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
    }

    async fn error_code(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let temp_dir = TempDir::new().unwrap();
        let response = router(test_state(&temp_dir))
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_auth() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir));

        let response = app
            .clone()
            .oneshot(request("GET", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "missing_auth");

        let response = app
            .clone()
            .oneshot(request("GET", Some("Basic abc")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(error_code(response).await, "invalid_auth");

        let response = app
            .oneshot(request("GET", Some("Bearer nope")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(error_code(response).await, "invalid_key");
    }

    #[tokio::test]
    async fn test_get_returns_etag() {
        let temp_dir = TempDir::new().unwrap();
        let response = router(test_state(&temp_dir))
            .oneshot(
                request("GET", Some("Bearer secret"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ETAG], "\"0\"");
    }

    #[tokio::test]
    async fn test_put_with_stale_if_match_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir));
        let body = r#"{"names": {"A": ["B"]}, "taken": {}}"#;

        let response = app
            .clone()
            .oneshot(
                request("PUT", Some("Bearer secret"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::IF_MATCH, "\"0\"")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ETAG], "\"1\"");

        let response = app
            .oneshot(
                request("PUT", Some("Bearer secret"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::IF_MATCH, "\"0\"")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(error_code(response).await, "version_conflict");
    }

    #[tokio::test]
    async fn test_put_without_if_match_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir);
        let app = router(state.clone());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    request("PUT", Some("Bearer secret"))
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(r#"{"names": {}, "taken": {"B": "A"}}"#))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let snapshot = state.store.fetch().await.unwrap();
        assert!(snapshot.document.is_taken("B"));
        assert_eq!(snapshot.version, Some(Version::new("2")));
    }

    #[test]
    fn test_load_api_keys_from_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "api_keys:\n  - key: abc\n    label: family\n  - key: def\n",
        )
        .unwrap();

        let keys = ApiKeys::load(&path);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.validate("abc"), Some("family"));
        assert_eq!(keys.validate("def"), Some("client"));
        assert_eq!(keys.validate("xyz"), None);
    }

    #[test]
    fn test_missing_config_yields_no_keys() {
        let temp_dir = TempDir::new().unwrap();
        let keys = ApiKeys::load(&temp_dir.path().join("missing.yaml"));
        assert!(keys.is_empty());
    }
}
