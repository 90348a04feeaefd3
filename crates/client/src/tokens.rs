//! Session token lifecycle
//!
//! [`TokenManager`] is the only writer of the stored session. It hands out the
//! current access token while it is inside its validity window and renews it
//! through the refresh endpoint otherwise. Renewal is single-flight: callers
//! that ask for a renewal while one is already running attach to it and
//! observe the same outcome, so the refresh endpoint is hit once per expiry.

use crate::clock::Clock;
use crate::error::ClientError;
use crate::session::{SessionStore, StoredSession};
use crate::types::{ApiResponse, RefreshData, RefreshTokenRequest, TokenPair};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{ACCEPT, HeaderValue};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Path of the token renewal endpoint
pub const REFRESH_PATH: &str = "/api/auth/refresh-token";

type Renewal = Shared<BoxFuture<'static, Option<String>>>;

/// Owns the persisted token pair and its coordinated renewal
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    skew_buffer_ms: i64,
    /// At most one renewal in flight, cleared once it settles
    renewal: Mutex<Option<Renewal>>,
}

impl TokenManager {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        skew_buffer_ms: i64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                store,
                clock,
                skew_buffer_ms,
                renewal: Mutex::new(None),
            }),
        }
    }

    /// Currently stored session. Store read failures are logged and read as
    /// "no session".
    pub fn session(&self) -> Option<StoredSession> {
        self.inner.load()
    }

    /// Whether a stored session holds an access or a refresh token.
    ///
    /// A session with an empty access token still counts while its refresh
    /// token can renew it. Partially written sessions read as none.
    pub fn has_credentials(&self) -> bool {
        self.session()
            .is_some_and(|s| !s.access_token.is_empty() || !s.refresh_token.is_empty())
    }

    /// Current access token, renewed first if it is outside its validity window
    pub async fn get_valid_access_token(&self) -> Option<String> {
        if let Some(session) = self.session() {
            if session.access_valid_at(self.inner.clock.now_ms()) {
                return Some(session.access_token);
            }
            debug!("Access token expired, renewing");
        }
        self.renew_access_token().await
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// Returns `None` without touching the network when no refresh token is
    /// stored. Any renewal failure clears the stored session and yields `None`.
    pub async fn renew_access_token(&self) -> Option<String> {
        let renewal = {
            let mut slot = self
                .inner
                .renewal
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(in_flight) = slot.as_ref() {
                debug!("Joining in-flight token renewal");
                in_flight.clone()
            } else {
                // An empty slot means any earlier renewal has already stored
                // its rotated refresh token, so the read must happen here.
                let refresh_token = match self.session() {
                    Some(session) if !session.refresh_token.is_empty() => session.refresh_token,
                    _ => {
                        debug!("No refresh token stored, skipping renewal");
                        return None;
                    }
                };

                let inner = Arc::clone(&self.inner);
                let renewal = async move {
                    let _reset = SlotReset(Arc::clone(&inner));
                    inner.refresh(&refresh_token).await
                }
                .boxed()
                .shared();
                *slot = Some(renewal.clone());
                renewal
            }
        };

        renewal.await
    }

    /// Persist a freshly issued token pair
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<StoredSession, ClientError> {
        let session = self.inner.session_from(tokens)?;
        self.inner.store.set(&session)?;
        debug!(
            expires_at_ms = session.access_expires_at_ms,
            "Stored new token pair"
        );
        Ok(session)
    }

    /// Remove the stored session. Safe to call when nothing is stored.
    pub fn clear_session(&self) {
        self.inner.clear();
    }

    /// Epoch milliseconds according to the injected clock
    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }
}

/// Empties the renewal slot when the renewal future completes or unwinds
struct SlotReset(Arc<Inner>);

impl Drop for SlotReset {
    fn drop(&mut self) {
        self.0
            .renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Inner {
    fn load(&self) -> Option<StoredSession> {
        match self.store.get() {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to read stored session: {}", e);
                None
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored session: {}", e);
        }
    }

    fn session_from(&self, tokens: &TokenPair) -> Result<StoredSession, ClientError> {
        StoredSession::from_tokens(tokens, self.clock.now_ms(), self.skew_buffer_ms).ok_or_else(
            || ClientError::Rejected(format!("Invalid token lifetime: {}", tokens.expires_in_ms)),
        )
    }

    async fn refresh(&self, refresh_token: &str) -> Option<String> {
        let session = match self
            .request_tokens(refresh_token)
            .await
            .and_then(|tokens| self.session_from(&tokens))
        {
            Ok(session) => session,
            Err(e) => {
                warn!("Token renewal failed, clearing session: {}", e);
                self.clear();
                return None;
            }
        };

        match self.store.set(&session) {
            Ok(()) => {
                info!(
                    expires_at_ms = session.access_expires_at_ms,
                    "Access token renewed"
                );
                Some(session.access_token)
            }
            Err(e) => {
                warn!("Failed to persist renewed tokens, clearing session: {}", e);
                self.clear();
                None
            }
        }
    }

    async fn request_tokens(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, REFRESH_PATH))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::from_status(status, status.to_string()));
        }

        let body: ApiResponse<RefreshData> = serde_json::from_slice(&response.bytes().await?)?;
        if !body.success {
            return Err(ClientError::Rejected(body.message));
        }
        Ok(body.data.tokens)
    }
}
