/*
[INPUT]:  HTTP configuration (base URL, timeouts), cookie jar
[OUTPUT]: Shared request pipeline with the 401 refresh interceptor
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::SET_COOKIE;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::http::cookies::CookieJar;
use crate::http::refresh::RefreshGate;
use crate::http::{MarketError, Result};
use crate::session::{SessionEvent, SessionEvents};
use crate::types::{ApiEnvelope, ErrorBody};

/// Default backend URL for local development
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Where session cookies are kept between runs; in memory when unset
    pub cookie_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            cookie_file: None,
        }
    }
}

/// One API call, kept around so the interceptor can replay it verbatim
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug)]
struct ClientInner {
    http_client: Client,
    base_url: String,
    cookies: CookieJar,
    refresh: RefreshGate,
    events: SessionEvents,
}

/// Marketplace API client.
///
/// Cloning is cheap and every clone shares the cookie jar, the refresh gate
/// and the session event bus, so one value per process acts as the single
/// request pipeline.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_events(config, SessionEvents::new())
    }

    /// Create a client that reports expiry on an existing event bus
    pub fn with_events(config: ClientConfig, events: SessionEvents) -> Result<Self> {
        // Validate early so a typo fails at startup rather than on first call.
        let base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(MarketError::Config(format!(
                "base URL cannot carry paths: {}",
                config.base_url
            )));
        }

        let cookies = match &config.cookie_file {
            Some(path) => CookieJar::open(path),
            None => CookieJar::in_memory(),
        };
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_provider(cookies.provider())
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                cookies,
                refresh: RefreshGate::new(),
                events,
            }),
        })
    }

    /// Create a client pointed at `base_url` with otherwise default settings
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.inner.cookies
    }

    /// Forget the session cookies, on disk too
    pub async fn clear_cookies(&self) {
        if let Err(err) = self.inner.cookies.clear().await {
            warn!(error = %err, "failed to clear cookie jar");
        }
    }

    /// Event bus the interceptor reports session expiry on
    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    pub fn subscribe_session_events(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Build full URL for an endpoint, keeping any path prefix of the base URL
    fn url(&self, endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", self.inner.base_url, endpoint))?)
    }

    /// Send a request through the 401 refresh interceptor
    pub async fn request<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<ApiEnvelope<T>> {
        let observed = self.inner.refresh.generation();
        let response = self.dispatch(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        debug!(endpoint = %request.endpoint, "received 401, refreshing session");
        self.inner
            .refresh
            .refresh_after(observed, &self.inner.events, || self.refresh_session())
            .await?;

        // Retried once; a second 401 is returned to the caller as-is.
        let retried = self.dispatch(request).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!(endpoint = %request.endpoint, "request still unauthorized after refresh");
        }
        decode(retried).await
    }

    /// Send a request without the interceptor (auth endpoints)
    pub(crate) async fn request_direct<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<ApiEnvelope<T>> {
        let response = self.dispatch(request).await?;
        decode(response).await
    }

    /// GET returning the `data` section
    pub async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let envelope = self.request::<T>(&ApiRequest::get(endpoint)).await?;
        require_data(envelope, endpoint)
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response> {
        let url = self.url(&request.endpoint)?;
        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, endpoint = %request.endpoint, "sending request");
        let response = builder.send().await?;
        if response.headers().contains_key(SET_COOKIE) {
            if let Err(err) = self.inner.cookies.save().await {
                warn!(error = %err, "failed to persist cookies");
            }
        }
        Ok(response)
    }
}

/// Turn a response into an envelope, mapping failures to [`MarketError::Api`]
async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        return Err(MarketError::api_error(status, message));
    }

    // refresh and logout may answer with an empty body
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiEnvelope {
            success: true,
            message: None,
            data: None,
        });
    }

    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)?;
    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| "request was not successful".to_string());
        return Err(MarketError::api_error(status, message));
    }
    Ok(envelope)
}

/// Id used as one path segment; anything that would change the route is rejected
pub(crate) fn path_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#', '%']) || id == "." || id == ".." {
        return Err(MarketError::Validation(format!("invalid id: {id:?}")));
    }
    Ok(id)
}

pub(crate) fn require_data<T>(envelope: ApiEnvelope<T>, endpoint: &str) -> Result<T> {
    envelope
        .data
        .ok_or_else(|| MarketError::InvalidResponse(format!("{endpoint} returned no data")))
}
