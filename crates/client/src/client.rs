//! Portal API client and the authorized request wrapper

use crate::clock::{Clock, SystemClock};
use crate::error::{ClientError, FALLBACK_MESSAGE};
use crate::session::{DEFAULT_SKEW_BUFFER_MS, MemorySessionStore, SessionStore};
use crate::tokens::TokenManager;
use crate::types::ApiResponse;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str = concat!("bookfair-client/", env!("CARGO_PKG_VERSION"));

/// Per-call options of [`BookfairClient::fetch`]
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw request body; sent as JSON unless a content type is set explicitly
    pub body: Option<String>,
    /// Send without a bearer token and never renew on 401
    pub skip_auth: bool,
    /// The call is already the retry after a renewal
    pub retry: bool,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serialize `body` as the JSON request body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    /// Use a pre-encoded request body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Book-fair portal API client
#[derive(Clone)]
pub struct BookfairClient {
    http: Client,
    base_url: String,
    tokens: TokenManager,
}

impl BookfairClient {
    /// Create a new client with default configuration and an in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> BookfairClientBuilder {
        BookfairClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token manager shared by every request issued through this client
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Forget the local session without contacting the backend
    pub fn clear_session(&self) {
        self.tokens.clear_session();
    }

    /// Issue a request, attaching the session's bearer token and renewing it
    /// once if the backend answers 401.
    ///
    /// Fails when the status is not a success or the envelope says
    /// `success: false`; the error carries the backend message when there is one.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, ClientError> {
        let mut retry = options.retry;

        loop {
            let response = self.send_once(path, &options, retry).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !options.skip_auth {
                if retry {
                    warn!(path, "Request rejected after token renewal, clearing session");
                    self.tokens.clear_session();
                    return Err(ClientError::Unauthorized);
                }

                debug!(path, "Received 401, renewing access token");
                if self.tokens.renew_access_token().await.is_none() {
                    return Err(ClientError::Unauthorized);
                }
                retry = true;
                continue;
            }

            return decode(response).await;
        }
    }

    async fn send_once(
        &self,
        path: &str,
        options: &RequestOptions,
        retry: bool,
    ) -> Result<Response, ClientError> {
        let mut headers = options.headers.clone();

        if !options.skip_auth {
            if let Some(token) = self.tokens.get_valid_access_token().await {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    ClientError::Validation("stored access token is not a valid header".into())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        if options.body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let url = format!("{}{}", self.base_url, path);
        debug!(method = %options.method, %url, retry, "Sending request");

        let mut request = self
            .http
            .request(options.method.clone(), url)
            .headers(headers);
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        Ok(request.send().await?)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|body| envelope_message(&body))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        return Err(ClientError::from_status(status, message));
    }

    let body: Value = serde_json::from_slice(&bytes)?;
    if body.get("success") == Some(&Value::Bool(false)) {
        let message = envelope_message(&body).unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        return Err(ClientError::Rejected(message));
    }

    Ok(serde_json::from_value(body)?)
}

fn envelope_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Builder for BookfairClient
#[derive(Default)]
pub struct BookfairClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    skew_buffer_ms: Option<i64>,
    store: Option<Arc<dyn SessionStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl BookfairClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Margin subtracted from every access token lifetime
    pub fn skew_buffer_ms(mut self, skew_buffer_ms: i64) -> Self {
        self.skew_buffer_ms = Some(skew_buffer_ms);
        self
    }

    /// Where the session is persisted (in memory by default)
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Time source for expiry bookkeeping (system clock by default)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<BookfairClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url:?}: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let skew_buffer_ms = self.skew_buffer_ms.unwrap_or(DEFAULT_SKEW_BUFFER_MS);
        if skew_buffer_ms < 0 {
            return Err(ClientError::Configuration(
                "skew_buffer_ms must not be negative".into(),
            ));
        }

        let mut client_builder = ClientBuilder::new();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder =
            client_builder.user_agent(self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT));
        let http = client_builder.build()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let tokens = TokenManager::new(http.clone(), base_url.clone(), store, clock, skew_buffer_ms);

        Ok(BookfairClient {
            http,
            base_url,
            tokens,
        })
    }
}
