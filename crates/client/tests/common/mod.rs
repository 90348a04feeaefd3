//! Shared fixtures for the client integration tests

#![allow(dead_code)]

use bookfair_client::{BookfairClient, ManualClock, MemorySessionStore, StoredSession};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

/// Fixed "now" every test starts from
pub const NOW: i64 = 1_760_000_000_000;

pub struct Harness {
    pub server: MockServer,
    pub client: BookfairClient,
    pub store: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let client = BookfairClient::builder()
            .base_url(server.uri())
            .session_store(store.clone())
            .clock(clock.clone())
            .build()
            .unwrap();

        Self {
            server,
            client,
            store,
            clock,
        }
    }

    /// Seed a session whose access token is valid for another minute
    pub fn seed_valid(&self, access: &str, refresh: &str) {
        self.seed(access, refresh, NOW + 60_000);
    }

    /// Seed a session whose access token has already expired
    pub fn seed_expired(&self, access: &str, refresh: &str) {
        self.seed(access, refresh, NOW - 1);
    }

    pub fn seed(&self, access: &str, refresh: &str, expires_at_ms: i64) {
        use bookfair_client::SessionStore;
        self.store
            .set(&StoredSession {
                access_token: access.into(),
                refresh_token: refresh.into(),
                access_expires_at_ms: expires_at_ms,
            })
            .unwrap();
    }

    pub fn stored(&self) -> Option<StoredSession> {
        use bookfair_client::SessionStore;
        self.store.get().unwrap()
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or_default()
    }
}

pub fn envelope(data: Value) -> Value {
    json!({
        "success": true,
        "message": "OK",
        "data": data,
        "timestamp": "2025-10-09T08:53:20Z"
    })
}

pub fn failure(message: &str) -> Value {
    json!({
        "success": false,
        "message": message,
        "data": null,
        "timestamp": "2025-10-09T08:53:20Z"
    })
}

pub fn tokens(access: &str, refresh: &str, expires_in: i64) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "expiresIn": expires_in
    })
}

pub fn user() -> Value {
    json!({
        "id": "3f1c2a9e-5b7d-4c8e-a1f0-9d8e7c6b5a40",
        "firstName": "Vera",
        "lastName": "Silva",
        "companyName": "Sarasavi Publishers",
        "email": "v@x.com",
        "mobileNo": "+94 77 123 4567",
        "role": "VENDOR",
        "status": "ACTIVE",
        "createdAt": "2025-10-01T10:00:00Z",
        "updatedAt": "2025-10-01T10:00:00Z"
    })
}

pub fn refresh_response(access: &str, refresh: &str) -> Value {
    envelope(json!({ "user": user(), "tokens": tokens(access, refresh, 900_000) }))
}
