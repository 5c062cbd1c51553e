//! REST API client.
//!
//! Thin wrapper over `reqwest` for the catalog, order, auth and payment
//! resources the API owns. Anonymous GET responses are cached with `moka`
//! (5-minute TTL, 1000 entries); a successful mutation invalidates every
//! cached entry under the mutated resource.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = ApiClient::new(&config.api)?;
//!
//! // Public, cached
//! let tires: Page<Tire> = client.list("/tires", &[("brand", "Michelin".into())], None).await?;
//!
//! // Authenticated, never cached; invalidates `/makes` on success
//! let make: Make = client.post("/makes", &json!({"make": "Subaru"}), Some(&token)).await?;
//! ```

mod cache;
mod envelope;

pub use envelope::{EnvelopeError, Page};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiConfig;

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 1000;

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request URL could not be built.
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    /// Response (or request body) was not the expected JSON.
    #[error("JSON parse error for {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// List response had an unknown shape.
    #[error("Unexpected list response for {path}: {source}")]
    Envelope {
        path: String,
        #[source]
        source: EnvelopeError,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token missing, invalid or expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// Token valid but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The API refused the request (validation, conflict, ...).
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The API failed.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
}

impl ApiError {
    /// Message safe to show in a toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::NotFound(_) => "That record no longer exists.".to_string(),
            Self::Unauthorized => "Please sign in again.".to_string(),
            Self::Forbidden => "You do not have access to that.".to_string(),
            Self::RateLimited(_) => "Too many requests, please try again shortly.".to_string(),
            _ => "The service is unavailable right now. Please try again.".to_string(),
        }
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, Arc<str>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("rimline-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .support_invalidation_closures()
            .build();

        // Url::join replaces the last segment unless the base ends with '/'
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                cache,
            }),
        })
    }

    /// Build the request URL; empty query values are skipped.
    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        if query.iter().any(|(_, value)| !value.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.iter().filter(|(_, value)| !value.is_empty()) {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and return the body of a successful response.
    async fn send(
        &self,
        method: Method,
        path: &str,
        url: Url,
        body: Option<&Value>,
        token: Option<&SecretString>,
    ) -> Result<String, ApiError> {
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }
        Err(status_error(status, path, &text))
    }

    async fn get_value(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&SecretString>,
        read_cache: bool,
    ) -> Result<Value, ApiError> {
        let url = self.url(path, query)?;

        let text: Arc<str> = if token.is_some() {
            self.send(Method::GET, path, url, None, token).await?.into()
        } else {
            let key = cache::key(&format!("/{}", path.trim_start_matches('/')), url.query());
            let cached = if read_cache {
                self.inner.cache.get(&key).await
            } else {
                None
            };
            if let Some(hit) = cached {
                debug!("Cache hit");
                hit
            } else {
                let text: Arc<str> = self.send(Method::GET, path, url, None, None).await?.into();
                self.inner.cache.insert(key, Arc::clone(&text)).await;
                text
            }
        };

        parse_json(path, &text)
    }

    /// GET a single document.
    ///
    /// Anonymous requests are served from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode as `T`.
    #[instrument(skip(self, query, token), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let value = self.get_value(path, query, token, true).await?;
        decode_document(path, value)
    }

    /// GET a single document from the API, never from the cache.
    ///
    /// Anonymous responses still replace the cached copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode as `T`.
    #[instrument(skip(self, token), fields(path = %path))]
    pub async fn get_fresh<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let value = self.get_value(path, &[], token, false).await?;
        decode_document(path, value)
    }

    /// GET a list, accepting a bare array or an envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a list of `T`.
    #[instrument(skip(self, query, token), fields(path = %path))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&SecretString>,
    ) -> Result<Page<T>, ApiError> {
        let value = self.get_value(path, query, token, true).await?;
        envelope::decode(value).map_err(|source| ApiError::Envelope {
            path: path.to_string(),
            source,
        })
    }

    /// POST a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not decode.
    #[instrument(skip(self, body, token), fields(path = %path))]
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        self.mutate(Method::POST, path, Some(body), token).await
    }

    /// PUT a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not decode.
    #[instrument(skip(self, body, token), fields(path = %path))]
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        self.mutate(Method::PUT, path, Some(body), token).await
    }

    /// DELETE a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(path = %path))]
    pub async fn delete(&self, path: &str, token: Option<&SecretString>) -> Result<(), ApiError> {
        let _: Value = self.mutate::<(), Value>(Method::DELETE, path, None, token).await?;
        Ok(())
    }

    async fn mutate<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, &[])?;
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|source| ApiError::Parse {
                path: path.to_string(),
                source,
            })?;

        let text = self.send(method, path, url, body.as_ref(), token).await?;
        self.invalidate(&cache::resource_of(path));

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            parse_json(path, &text)?
        };
        serde_json::from_value(value).map_err(|source| ApiError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Drop every cached response under `resource` (e.g. `/tires`).
    pub fn invalidate(&self, resource: &str) {
        let prefix = resource.to_string();
        let result = self
            .inner
            .cache
            .invalidate_entries_if(move |key, _| cache::in_resource(key, &prefix));
        match result {
            Ok(_) => debug!(resource = %resource, "Invalidated cached responses"),
            Err(e) => {
                warn!(error = %e, resource = %resource, "Predicate invalidation failed, clearing cache");
                self.inner.cache.invalidate_all();
            }
        }
    }

    /// Check that the API answers its health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.url("/health", &[])?;
        self.send(Method::GET, "/health", url, None, None).await?;
        Ok(())
    }
}

/// Path of a single document, with the id percent-encoded.
#[must_use]
pub fn doc_path(resource: &str, id: &str) -> String {
    format!("/{resource}/{}", urlencoding::encode(id))
}

fn decode_document<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|source| ApiError::Parse {
        path: path.to_string(),
        source,
    })
}

fn parse_json(path: &str, text: &str) -> Result<Value, ApiError> {
    serde_json::from_str(text).map_err(|source| {
        tracing::error!(
            path = %path,
            error = %source,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse API response"
        );
        ApiError::Parse {
            path: path.to_string(),
            source,
        }
    })
}

/// Map a non-success status to an error.
fn status_error(status: StatusCode, path: &str, body: &str) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        s if s.is_client_error() => ApiError::Rejected {
            status: s.as_u16(),
            message: error_message(body)
                .unwrap_or_else(|| s.canonical_reason().unwrap_or("Request rejected").to_string()),
        },
        s => {
            tracing::error!(
                status = %s,
                path = %path,
                body = %body.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            ApiError::Upstream {
                status: s.as_u16(),
                message: error_message(body).unwrap_or_else(|| s.to_string()),
            }
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"message": ..}`, `{"error": ..}` and `{"errors": [..]}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let text = |v: &Value| {
        v.as_str()
            .map(str::to_string)
            .or_else(|| v.get("message").and_then(Value::as_str).map(str::to_string))
    };

    if let Some(message) = value.get("message").and_then(text) {
        return Some(message);
    }
    if let Some(message) = value.get("error").and_then(text) {
        return Some(message);
    }
    let messages: Vec<String> = value
        .get("errors")?
        .as_array()?
        .iter()
        .filter_map(text)
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_url_keeps_base_path_and_skips_empty_params() {
        let client = client("http://127.0.0.1:4000/api");
        let url = client
            .url(
                "/tires",
                &[("page", "2".to_string()), ("brand", String::new())],
            )
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:4000/api/tires?page=2");

        let url = client.url("tyre-sizes", &[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:4000/api/tyre-sizes");
    }

    #[test]
    fn test_url_encodes_query_values() {
        let client = client("http://127.0.0.1:4000/");
        let url = client
            .url("/tires", &[("size", "225/45R17".to_string())])
            .unwrap();
        assert_eq!(url.query(), Some("size=225%2F45R17"));
    }

    #[test]
    fn test_doc_path_encodes_id() {
        assert_eq!(doc_path("makes", "64f1c0"), "/makes/64f1c0");
        assert_eq!(doc_path("makes", "../users"), "/makes/..%2Fusers");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "/tires/x", ""),
            ApiError::NotFound(path) if path == "/tires/x"
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "/orders/mine", ""),
            ApiError::Unauthorized
        ));
        let err = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "/makes",
            r#"{"message": "Make already exists"}"#,
        );
        assert_eq!(err.user_message(), "Make already exists");
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "/tires", "oops"),
            ApiError::Upstream { status: 502, .. }
        ));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"error": "bad"}"#).as_deref(), Some("bad"));
        assert_eq!(
            error_message(r#"{"errors": [{"message": "name is required"}, "price must be positive"]}"#)
                .as_deref(),
            Some("name is required; price must be positive")
        );
        assert_eq!(error_message("<html>"), None);
    }
}
