//! Authenticated HTTP client.
//!
//! Every request runs through a fixed pipeline:
//!
//! 1. attach auth: the current access token becomes a bearer header
//! 2. send, with the configured timeout
//! 3. classify the attempt and ask the [`RetryPolicy`] what to do
//! 4. on 401, wait for the [`RefreshCoordinator`] and re-issue; on 5xx or a
//!    network failure, back off and re-issue
//!
//! Retries of one request are sequential, so a caller's requests resolve in
//! the order it issued them.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use gatehouse_core::error::{AuthError, InvalidInputError, NetworkError};
use gatehouse_core::{AccessToken, ApiErrorBody, ApiUrl, Error, RefreshToken, Result, TokenPair, TokenStore};

use crate::config::ClientConfig;
use crate::endpoints::AUTH_REFRESH;
use crate::refresh::{AuthEvent, CoordinatorState, RefreshCoordinator, RefreshOutcome, Refresher};
use crate::retry::{AttemptOutcome, RetryDecision, RetryPolicy};

/// Header carrying the per-request idempotency key.
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Whether a request carries the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

/// HTTP client for the upstream API.
///
/// Cheap to clone; clones share the token store, the refresh coordinator and
/// the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    api: ApiUrl,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    coordinator: RefreshCoordinator,
}

impl HttpClient {
    /// Create a client for `config.api_url` that reads and writes tokens in
    /// `store`.
    pub fn new(store: Arc<dyn TokenStore>, config: ClientConfig) -> Result<Self> {
        let api = config.api_url.clone();
        let http = build_http(&config)?;
        let refresher = Arc::new(HttpRefresher {
            http: http.clone(),
            url: api.endpoint(AUTH_REFRESH),
            timeout_ms: config.timeout_ms(),
        });

        Ok(Self::with_refresher(api, store, config, http, refresher))
    }

    fn with_refresher(
        api: ApiUrl,
        store: Arc<dyn TokenStore>,
        config: ClientConfig,
        http: reqwest::Client,
        refresher: Arc<dyn Refresher>,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(store.clone(), refresher);
        Self {
            inner: Arc::new(ClientInner {
                http,
                api,
                config,
                store,
                coordinator,
            }),
        }
    }

    /// Returns the API base URL.
    pub fn api(&self) -> &ApiUrl {
        &self.inner.api
    }

    /// Returns the token store shared with the refresh coordinator.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Returns the retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.config.retry
    }

    /// Returns the refresh coordinator state.
    pub fn refresh_state(&self) -> CoordinatorState {
        self.inner.coordinator.state()
    }

    /// Subscribe to session events such as [`AuthEvent::LoginRequired`].
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.coordinator.subscribe()
    }

    /// Persist a freshly issued pair and leave the Failed state.
    pub fn start_session(&self, pair: TokenPair) -> Result<()> {
        self.inner.store.set(pair)?;
        self.inner.coordinator.reset();
        Ok(())
    }

    /// Drop the stored tokens.
    pub fn end_session(&self) -> Result<()> {
        self.inner.store.clear()
    }

    /// Refresh the session now, sharing any refresh already in flight.
    pub async fn refresh_session(&self) -> Result<()> {
        let current = self.stored_access_token();
        match self
            .inner
            .coordinator
            .refresh_after_unauthorized(current.as_ref())
            .await
        {
            RefreshOutcome::Refreshed(_) => Ok(()),
            RefreshOutcome::Rejected(reason) => Err(AuthError::RefreshRejected { reason }.into()),
        }
    }

    /// Send an authenticated request and return the 2xx response.
    ///
    /// Non-2xx responses that survive the retry policy come back as errors.
    pub async fn request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, body, Auth::Bearer).await
    }

    /// Send a request without credentials (login, registration).
    ///
    /// A 401 here is an ordinary error, not a refresh trigger.
    pub async fn request_anonymous<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, body, Auth::Anonymous).await
    }

    /// Authenticated GET, decoding the JSON body.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.request::<()>(Method::GET, path, None).await?;
        decode(response, self.inner.config.timeout_ms()).await
    }

    /// Authenticated POST with a JSON body.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.request(Method::POST, path, Some(body)).await?;
        decode(response, self.inner.config.timeout_ms()).await
    }

    /// Authenticated PUT with a JSON body.
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.request(Method::PUT, path, Some(body)).await?;
        decode(response, self.inner.config.timeout_ms()).await
    }

    /// Authenticated PATCH with a JSON body.
    pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.request(Method::PATCH, path, Some(body)).await?;
        decode(response, self.inner.config.timeout_ms()).await
    }

    /// Authenticated DELETE, decoding the JSON body.
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.request::<()>(Method::DELETE, path, None).await?;
        decode(response, self.inner.config.timeout_ms()).await
    }

    /// Anonymous POST with a JSON body.
    pub async fn post_anonymous<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.request_anonymous(Method::POST, path, Some(body)).await?;
        decode(response, self.inner.config.timeout_ms()).await
    }

    #[instrument(skip(self, body), fields(api = %self.inner.api))]
    async fn execute<B>(&self, method: Method, path: &str, body: Option<&B>, auth: Auth) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.inner.api.endpoint(path);
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| InvalidInputError::Other {
                message: format!("request body is not serializable: {}", e),
            })?;

        let policy = &self.inner.config.retry;
        let idempotency_key = policy
            .needs_idempotency_key(&method)
            .then(|| Uuid::new_v4().to_string());

        let mut retries = 0;
        let mut next_token: Option<AccessToken> = None;

        loop {
            let token = match auth {
                Auth::Bearer => next_token.take().or_else(|| self.stored_access_token()),
                Auth::Anonymous => None,
            };

            let attempt = self
                .send_once(&method, &url, payload.as_deref(), token.as_ref(), idempotency_key.as_deref())
                .await;

            let outcome = match &attempt {
                Ok(response) => match AttemptOutcome::from_status(response.status().as_u16()) {
                    AttemptOutcome::Unauthorized if auth == Auth::Anonymous => {
                        AttemptOutcome::ClientError(401)
                    }
                    outcome => outcome,
                },
                Err(Error::Network(NetworkError::Connection { .. } | NetworkError::Timeout { .. })) => {
                    AttemptOutcome::NetworkFailure
                }
                Err(_) => AttemptOutcome::Fatal,
            };

            match policy.decide(&method, outcome, retries) {
                RetryDecision::Return => {
                    let response = attempt?;
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    return Err(error_from_response(response).await);
                }
                RetryDecision::Retry { after } => {
                    debug!(retries, ?outcome, delay_ms = after.as_millis() as u64, "Retrying request");
                    if !after.is_zero() {
                        tokio::time::sleep(after).await;
                    }
                }
                RetryDecision::RefreshThenRetry => {
                    debug!(retries, "Unauthorized, waiting for refresh");
                    match self
                        .inner
                        .coordinator
                        .refresh_after_unauthorized(token.as_ref())
                        .await
                    {
                        RefreshOutcome::Refreshed(token) => next_token = Some(token),
                        RefreshOutcome::Rejected(reason) => {
                            return Err(AuthError::RefreshRejected { reason }.into());
                        }
                    }
                }
                RetryDecision::LoginRequired => {
                    warn!(%method, path, "Still unauthorized after refresh, login required");
                    self.inner.coordinator.signal_login_required();
                    return Err(AuthError::LoginRequired.into());
                }
            }

            retries += 1;
        }
    }

    /// One network round trip. Logs non-2xx responses.
    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        payload: Option<&[u8]>,
        token: Option<&AccessToken>,
        idempotency_key: Option<&str>,
    ) -> Result<Response> {
        let mut builder = self
            .inner
            .http
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, bearer(token.as_str())?);
        }
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY, key);
        }
        if let Some(payload) = payload {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_vec());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| send_error(e, self.inner.config.timeout_ms()))?;

        let status = response.status();
        trace!(status = %status, "Response");
        if !status.is_success() {
            warn!(%method, path = response.url().path(), status = status.as_u16(), "Request failed");
        }

        Ok(response)
    }

    fn stored_access_token(&self) -> Option<AccessToken> {
        match self.inner.store.get() {
            Ok(pair) => pair.map(|p| p.access_token),
            Err(e) => {
                warn!(error = %e, "Failed to read token store, sending without credentials");
                None
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("api", &self.inner.api)
            .field("config", &self.inner.config)
            .field("coordinator", &self.inner.coordinator)
            .finish()
    }
}

/// Calls the refresh endpoint with the refresh token as bearer credential.
/// Bypasses the retry pipeline.
struct HttpRefresher {
    http: reqwest::Client,
    url: String,
    timeout_ms: u64,
}

#[async_trait]
impl Refresher for HttpRefresher {
    async fn refresh(&self, token: &RefreshToken) -> Result<TokenPair> {
        debug!(url = %self.url, "Calling refresh endpoint");

        let response = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, bearer(token.as_str())?)
            .send()
            .await
            .map_err(|e| network_error(e, self.timeout_ms))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let envelope: gatehouse_core::ApiResponse<gatehouse_core::LoginData> =
            decode(response, self.timeout_ms).await?;
        let (pair, _) = envelope.into_data().into_parts();
        Ok(pair)
    }
}

fn build_http(config: &ClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .build()
        .map_err(|e| {
            NetworkError::Other {
                message: format!("failed to build HTTP client: {}", e),
            }
            .into()
        })
}

fn bearer(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        InvalidInputError::Other {
            message: "token contains characters not allowed in a header".to_string(),
        }
        .into()
    })
}

fn network_error(err: reqwest::Error, timeout_ms: u64) -> Error {
    let err = if err.is_timeout() {
        NetworkError::Timeout {
            duration_ms: timeout_ms,
        }
    } else if err.is_connect() {
        NetworkError::Connection {
            message: err.to_string(),
        }
    } else {
        NetworkError::Other {
            message: err.to_string(),
        }
    };
    Error::Network(err)
}

/// Map a failed `send()`. Anything past request building is a transport
/// failure, including a peer that drops an established connection.
fn send_error(err: reqwest::Error, timeout_ms: u64) -> Error {
    if err.is_timeout() || err.is_builder() {
        return network_error(err, timeout_ms);
    }
    Error::Network(NetworkError::Connection {
        message: err.to_string(),
    })
}

/// Decode a 2xx JSON body.
async fn decode<R: DeserializeOwned>(response: Response, timeout_ms: u64) -> Result<R> {
    let status = response.status().as_u16();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| network_error(e, timeout_ms))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        NetworkError::Other {
            message: format!("unexpected response body (HTTP {}): {}", status, e),
        }
        .into()
    })
}

/// Turn a non-2xx response into an error, reading the error envelope if
/// there is one.
async fn error_from_response(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ApiErrorBody>(&bytes).ok(),
        Err(_) => None,
    };
    Error::from_response(status, body)
}
