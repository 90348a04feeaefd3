//! Persisted session state
//!
//! The session is the only piece of durable state the client owns. It is kept
//! behind the [`SessionStore`] trait so an installation can persist it to disk
//! while tests and embedders keep it in memory.

mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use crate::error::ClientError;
use crate::types::TokenPair;

pub const ACCESS_TOKEN_KEY: &str = "auth.accessToken";
pub const REFRESH_TOKEN_KEY: &str = "auth.refreshToken";
pub const ACCESS_EXPIRES_AT_KEY: &str = "auth.accessExpiresAt";

/// Margin subtracted from the server-reported lifetime of an access token
pub const DEFAULT_SKEW_BUFFER_MS: i64 = 5_000;

/// Token pair as persisted, with the access expiry resolved to a wall-clock instant
#[derive(Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at_ms: i64,
}

impl StoredSession {
    /// Derive the persisted form of a freshly issued token pair.
    ///
    /// Returns `None` when the lifetime is negative or the expiry does not fit
    /// in epoch milliseconds.
    pub fn from_tokens(tokens: &TokenPair, now_ms: i64, skew_buffer_ms: i64) -> Option<Self> {
        if tokens.expires_in_ms < 0 {
            return None;
        }
        let access_expires_at_ms = now_ms
            .checked_add(tokens.expires_in_ms)?
            .checked_sub(skew_buffer_ms)?;
        Some(Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            access_expires_at_ms,
        })
    }

    /// Whether the access token may still be sent as-is
    pub fn access_valid_at(&self, now_ms: i64) -> bool {
        !self.access_token.is_empty() && now_ms < self.access_expires_at_ms
    }

    pub(crate) fn entries(&self) -> [(&'static str, String); 3] {
        [
            (ACCESS_TOKEN_KEY, self.access_token.clone()),
            (REFRESH_TOKEN_KEY, self.refresh_token.clone()),
            (ACCESS_EXPIRES_AT_KEY, self.access_expires_at_ms.to_string()),
        ]
    }

    /// Rebuild a session from key-value entries. Missing keys or an
    /// unparseable expiry mean there is no usable session.
    pub(crate) fn from_entries(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let access_token = get(ACCESS_TOKEN_KEY)?;
        let refresh_token = get(REFRESH_TOKEN_KEY)?;
        let access_expires_at_ms = get(ACCESS_EXPIRES_AT_KEY)?.trim().parse().ok()?;
        Some(Self {
            access_token,
            refresh_token,
            access_expires_at_ms,
        })
    }
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_expires_at_ms", &self.access_expires_at_ms)
            .finish()
    }
}

/// Storage for the single active session of an installation
pub trait SessionStore: Send + Sync {
    /// Read the stored session, if a complete one exists
    fn get(&self) -> Result<Option<StoredSession>, ClientError>;

    /// Replace the stored session in one step
    fn set(&self, session: &StoredSession) -> Result<(), ClientError>;

    /// Remove every session key. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), ClientError>;
}
