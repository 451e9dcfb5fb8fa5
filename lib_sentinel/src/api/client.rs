//! # REST Client
//!
//! An asynchronous client for the console backend built on `reqwest` and
//! `reqwest-middleware`. It joins paths onto the base URL, attaches the bearer
//! token from the [`TokenStore`], decodes JSON responses and normalises
//! failures into [`ClientError`].
//!
//! GET requests go through a retry middleware (one retry by default) because
//! they are idempotent. Every other verb is sent exactly once.
//!
//! A 401 on a request that carried a token means the session is gone: the
//! token is removed and [`SessionEvent::Expired`] is broadcast so the
//! navigation layer can send the user back to the login screen.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use url::{form_urlencoded, Url};

use crate::api::error::{fallback_message, ClientError};
use crate::api::token_store::TokenStore;

/// Default REST base URL of a locally running backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Session lifecycle notifications raised by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend rejected the stored token.
    Expired,
}

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Applies to every request, connect through body.
    pub timeout: Duration,
    /// Retries for GET requests. Zero disables the retry middleware.
    pub read_retries: u32,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(10_000),
            read_retries: 1,
            retry_min_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(2),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// A decoded response with its transport metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub headers: HeaderMap,
}

/// Request body variants.
enum Body {
    Empty,
    Json(String),
    Form(String),
}

struct ClientInner {
    reads: ClientWithMiddleware,
    writes: ClientWithMiddleware,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    sessions: broadcast::Sender<SessionEvent>,
}

/// Shared REST client. Clones share the connection pool, token store and session channel.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Builds the client.
    ///
    /// # Errors
    /// Fails when `base_url` is not an absolute URL or the TLS backend cannot be initialised.
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        // `Url::join` replaces the last segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        let reads = if config.read_retries > 0 {
            let retry_policy = ExponentialBackoff::builder()
                .retry_bounds(
                    config.retry_min_delay,
                    config.retry_max_delay.max(config.retry_min_delay),
                )
                .build_with_max_retries(config.read_retries);
            ClientBuilder::new(http.clone())
                .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                .build()
        } else {
            ClientBuilder::new(http.clone()).build()
        };
        let writes = ClientBuilder::new(http).build();

        let (sessions, _) = broadcast::channel(16);
        Ok(Self {
            inner: Arc::new(ClientInner {
                reads,
                writes,
                base_url,
                tokens,
                sessions,
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    /// Receives [`SessionEvent`]s raised after this call.
    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.sessions.subscribe()
    }

    /// Resolves `path` (with or without a leading slash) against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        Ok(self.send(Method::GET, url, Body::Empty, true).await?.data)
    }

    /// GET keeping the status and response headers alongside the body.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ClientError> {
        let url = self.endpoint(path)?;
        self.send(Method::GET, url, Body::Empty, true).await
    }

    /// GET with query parameters. Pairs are appended in order.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(self.send(Method::GET, url, Body::Empty, true).await?.data)
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let body = serde_json::to_string(body).map_err(ClientError::Encode)?;
        Ok(self.send(Method::POST, url, Body::Json(body), true).await?.data)
    }

    /// Form-encoded POST for the credential exchange. No bearer token is attached.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().copied())
            .finish();
        Ok(self.send(Method::POST, url, Body::Form(body), false).await?.data)
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let body = serde_json::to_string(body).map_err(ClientError::Encode)?;
        Ok(self.send(Method::PUT, url, Body::Json(body), true).await?.data)
    }

    /// DELETE; any response body is discarded.
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.endpoint(path)?;
        self.send::<Value>(Method::DELETE, url, Body::Empty, true)
            .await
            .map(|_| ())
    }

    /// Performs one request and decodes a 2xx body into `T`.
    ///
    /// An empty body decodes as JSON `null`, which suits `()` and `Option<_>` targets.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Body,
        authenticate: bool,
    ) -> Result<ApiResponse<T>, ClientError> {
        let client = if method == Method::GET {
            &self.inner.reads
        } else {
            &self.inner.writes
        };
        log::debug!("{} {}", method, url);
        let mut req = client
            .request(method.clone(), url.clone())
            .header(ACCEPT, "application/json");

        let token = if authenticate {
            self.inner.tokens.get()
        } else {
            None
        };
        if let Some(token) = &token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        req = match body {
            Body::Empty => req,
            Body::Json(json) => req.header(CONTENT_TYPE, "application/json").body(json),
            Body::Form(form) => req
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(form),
        };

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(&e))?;

        if status.is_success() {
            let data: T = if bytes.is_empty() {
                serde_json::from_slice(b"null")
            } else {
                serde_json::from_slice(&bytes)
            }
            .map_err(ClientError::Decode)?;
            return Ok(ApiResponse {
                data,
                status: status.as_u16(),
                headers,
            });
        }

        let status = status.as_u16();
        if status == 401 && token.is_some() {
            log::warn!("{} {} rejected the session token; logging out.", method, url);
            self.expire_session();
            return Err(ClientError::SessionExpired);
        }

        let message = error_detail(&bytes).unwrap_or_else(|| fallback_message(status));
        log::warn!("{} {} failed ({}): {}", method, url, status, message);
        Err(ClientError::Http { status, message })
    }

    fn expire_session(&self) {
        if let Err(e) = self.inner.tokens.remove() {
            log::error!("Failed to clear the expired session token: {}", e);
        }
        // No receivers simply means nobody is navigating.
        let _ = self.inner.sessions.send(SessionEvent::Expired);
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish()
    }
}

/// Extracts a human readable `detail` from an error body.
///
/// FastAPI-style validation errors carry a list; the first entry's `msg` is used.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.is_empty() => Some(detail.clone()),
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
