//! Authenticated API client
//!
//! Every request goes through the same pipeline:
//! 1. pre-network validation of the request shape
//! 2. bearer token attached from the [`TokenStore`], only for URLs on the
//!    configured API origin
//! 3. exchange through the retrying [`HttpClient`] under the client-wide
//!    timeout
//! 4. non-success statuses classified into [`ApiError`]; a 401 on a
//!    regular request is handed to the [`RefreshCoordinator`]
//! 5. only the decoded payload is returned to the caller

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use photox_core::{SessionEndReason, SessionObserver};
use photox_domain::ClientConfig;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::errors::ApiError;
use super::refresh::{RefreshCoordinator, RefreshedTokens, Replay, TokenRefresher};
use super::request::{ApiRequest, RequestBody, RequestKind};
use crate::auth::{SessionEvents, TokenStore};
use crate::http::HttpClient;

pub(crate) const TOKEN_REFRESH_PATH: &str = "/users/token/refresh/";

struct ClientInner {
    http: HttpClient,
    config: ClientConfig,
    timeout: Duration,
    tokens: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}

/// Shared API client.
///
/// Cheap to clone; clones share the token store and refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Create a client with an in-memory token store
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Timeout applied to every exchange
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.inner.coordinator
    }

    /// Whether an access token is present
    pub async fn is_authenticated(&self) -> bool {
        self.inner.tokens.is_authenticated().await
    }

    /// Execute a request and return the decoded payload
    ///
    /// # Errors
    ///
    /// Returns the classified error; a 401 is only surfaced after the
    /// refresh coordinator failed to recover it
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        request.validate()?;

        match self.inner.dispatch(&request).await {
            Err(err) if err.is_unauthorized() && request.kind == RequestKind::Standard => {
                debug!("Access token rejected, deferring to refresh coordinator");
                let inner = Arc::clone(&self.inner);
                let replay: Replay =
                    Box::new(move || async move { inner.dispatch(&request).await }.boxed());
                let refresher: Arc<dyn TokenRefresher> = self.inner.clone();
                self.inner.coordinator.recover(err, replay, refresher).await
            }
            Err(err) if err.is_unauthorized() && request.kind == RequestKind::Refresh => {
                self.inner.coordinator.end_session(SessionEndReason::RefreshFailed).await;
                Err(err)
            }
            outcome => outcome,
        }
    }

    /// Execute a request and deserialize the payload into `T`
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::execute`], plus [`ApiError::Decode`] when the
    /// payload does not match `T`
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let payload = self.execute(request).await?;
        serde_json::from_value(payload)
            .map_err(|err| ApiError::Decode(format!("unexpected response shape: {err}")))
    }

    /// Exchange the refresh token for a new access token now.
    ///
    /// Joins a refresh already in flight instead of issuing a second one.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let refresher: Arc<dyn TokenRefresher> = self.inner.clone();
        self.inner.coordinator.refresh_now(refresher).await
    }
}

impl ClientInner {
    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Absolute URLs elsewhere (CDN links, foreign page links) get no token.
    fn on_api_origin(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.config.base_url)) {
            (Ok(target), Ok(base)) => target.origin() == base.origin(),
            _ => false,
        }
    }

    /// One pass through the pipeline, without refresh handling
    async fn dispatch(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        // Credential exchanges never carry the (possibly expired) bearer
        if request.kind == RequestKind::Standard && self.on_api_origin(&url) {
            if let Some(token) = self.tokens.access_token().await {
                builder = builder.bearer_auth(token);
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        let response = match tokio::time::timeout(self.timeout, self.http.send(builder)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(self.transport_error(err)),
            Err(_) => return Err(ApiError::Timeout(self.timeout)),
        };

        let status = response.status();
        let cause = response.error_for_status_ref().err();
        let body = response.bytes().await.map_err(|err| self.transport_error(err))?;

        if !status.is_success() {
            warn!(%status, url = %url, "Request failed");
            return Err(ApiError::from_status(status, error_body(&body), cause, request.kind));
        }

        let no_content = status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT;
        if body.is_empty() || no_content {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::Decode(format!("response from {url} is not JSON: {err}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if err.is_builder() {
            ApiError::Config(format!("invalid request: {err}"))
        } else {
            ApiError::Network(err)
        }
    }
}

#[async_trait]
impl TokenRefresher for ClientInner {
    async fn exchange(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let request = ApiRequest::post(TOKEN_REFRESH_PATH)
            .json(json!({ "refresh": refresh_token }))
            .kind(RequestKind::Refresh);

        let payload = self.dispatch(&request).await?;
        serde_json::from_value(payload)
            .map_err(|err| ApiError::Decode(format!("unexpected refresh response: {err}")))
    }
}

fn error_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Builder for [`ApiClient`]
pub struct ApiClientBuilder {
    config: ClientConfig,
    timeout: Option<Duration>,
    tokens: Option<Arc<TokenStore>>,
    session: Option<Arc<dyn SessionObserver>>,
    max_attempts: usize,
    base_backoff: Duration,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            timeout: None,
            tokens: None,
            session: None,
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl ApiClientBuilder {
    /// Set the base URL and timeout
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the configured timeout with sub-second precision
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share an existing token store (defaults to an in-memory one)
    pub fn token_store(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Receive session teardown notifications (defaults to [`SessionEvents`])
    pub fn session_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.session = Some(observer);
        self
    }

    /// Total attempts for requests that fail to connect
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let timeout = self.timeout.unwrap_or_else(|| self.config.timeout());
        let http = HttpClient::builder()
            .timeout(timeout)
            .max_attempts(self.max_attempts)
            .base_backoff(self.base_backoff)
            .user_agent(concat!("photox/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let tokens = self.tokens.unwrap_or_else(|| Arc::new(TokenStore::in_memory()));
        let session = self.session.unwrap_or_else(|| Arc::new(SessionEvents::new()));
        let coordinator = Arc::new(RefreshCoordinator::new(tokens.clone(), session));

        let inner = ClientInner { http, config: self.config, timeout, tokens, coordinator };
        Ok(ApiClient { inner: Arc::new(inner) })
    }
}
