//! Integration tests for the portal client: wrapped requests and the auth facade

mod common;

use bookfair_client::session::{ACCESS_EXPIRES_AT_KEY, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use bookfair_client::{
    AuthContext, BookfairClient, ClientError, FileSessionStore, RegistrationForm, RequestOptions,
    UpdateProfileRequest, UserProfile,
};
use common::{Harness, NOW, envelope, failure, refresh_response, tokens, user};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn auth_response(access: &str, refresh: &str, expires_in: i64) -> Value {
    envelope(json!({ "user": user(), "tokens": tokens(access, refresh, expires_in) }))
}

#[tokio::test]
async fn test_login_persists_tokens_with_skew() {
    let h = Harness::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "email": "v@x.com", "password": "secret123" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_response("access-1", "refresh-1", 900_000)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let data = h.client.login("v@x.com", "secret123").await.unwrap();
    assert_eq!(data.user.email, "v@x.com");

    let expected = (NOW + 900_000 - 5_000).to_string();
    assert_eq!(h.store.raw(ACCESS_EXPIRES_AT_KEY), Some(expected));
    assert_eq!(h.store.raw(ACCESS_TOKEN_KEY).as_deref(), Some("access-1"));
    assert_eq!(h.store.raw(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_failure_surfaces_backend_message() {
    let h = Harness::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Invalid email or password")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_response("x", "y")))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.client.login("v@x.com", "wrong-pass").await.unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed(_)));
    assert_eq!(err.to_string(), "Invalid email or password");
    assert!(h.stored().is_none());
}

#[tokio::test]
async fn test_register_stores_tokens() {
    let h = Harness::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "firstName": "Vera",
            "lastName": "Silva",
            "companyName": "Sarasavi Publishers",
            "email": "v@x.com",
            "mobileNo": "+94 77 123 4567",
            "password": "secret123"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(auth_response("access-1", "refresh-1", 60_000)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let form = RegistrationForm {
        first_name: "Vera".into(),
        last_name: "Silva".into(),
        company_name: "Sarasavi Publishers".into(),
        email: "v@x.com".into(),
        mobile_no: "+94 77 123 4567".into(),
        password: "secret123".into(),
        confirm_password: "secret123".into(),
        role: None,
    };
    let data = h.client.register(&form.validate().unwrap()).await.unwrap();

    assert_eq!(data.user.role, "VENDOR");
    assert_eq!(h.stored().unwrap().access_expires_at_ms, NOW + 60_000 - 5_000);
}

#[tokio::test]
async fn test_register_with_mismatched_confirmation_never_reaches_the_network() {
    let h = Harness::new().await;
    let context = AuthContext::new(h.client.clone());

    let form = RegistrationForm {
        first_name: "Vera".into(),
        email: "v@x.com".into(),
        mobile_no: "0771234567".into(),
        password: "secret123".into(),
        confirm_password: "secret321".into(),
        ..RegistrationForm::default()
    };

    let err = context.register(&form).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(ref m) if m == "Passwords do not match"));
    assert_eq!(h.request_count().await, 0);
    assert!(h.stored().is_none());
    assert!(!context.is_authenticated());
}

#[tokio::test]
async fn test_authorized_request_carries_bearer_token() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user())))
        .expect(1)
        .mount(&h.server)
        .await;

    let profile = h.client.current_user().await.unwrap();
    assert_eq!(profile.display_name(), "Vera Silva");

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("content-type").is_none());
}

#[tokio::test]
async fn test_401_renews_and_retries_once_with_new_token() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Token expired")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user())))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(refresh_response("access-2", "refresh-2")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let profile = h.client.current_user().await.unwrap();
    assert_eq!(profile.email, "v@x.com");
    assert_eq!(h.stored().unwrap().access_token, "access-2");
}

#[tokio::test]
async fn test_second_401_is_unauthorized_without_third_attempt() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Token expired")))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(refresh_response("access-2", "refresh-2")),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.current_user().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized");
    assert!(h.stored().is_none());
}

#[tokio::test]
async fn test_401_without_renewable_session_is_unauthorized() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Invalid refresh token")))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.current_user().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_caller_marked_retry_is_not_retried() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/stalls"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_response("x", "y")))
        .expect(0)
        .mount(&h.server)
        .await;

    let options = RequestOptions {
        retry: true,
        ..RequestOptions::get()
    };
    let err = h.client.fetch::<Value>("/api/stalls", options).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_skip_auth_401_is_not_renewed() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/public/stalls"))
        .respond_with(ResponseTemplate::new(401).set_body_json(failure("Login required")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_response("x", "y")))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h
        .client
        .fetch::<Value>("/api/public/stalls", RequestOptions::get().skip_auth())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed(ref m) if m == "Login required"));
    assert_eq!(h.stored().unwrap().access_token, "access-1");

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_explicit_content_type_is_preserved() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("POST"))
        .and(path("/api/reservations/import"))
        .and(header("content-type", "text/csv"))
        .and(header("accept", "application/json"))
        .and(body_string("stall,vendor\nA1,v@x.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({ "imported": 1 }))))
        .expect(1)
        .mount(&h.server)
        .await;

    let options = RequestOptions::post()
        .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .body("stall,vendor\nA1,v@x.com");
    let response = h
        .client
        .fetch::<Value>("/api/reservations/import", options)
        .await
        .unwrap();
    assert_eq!(response.data["imported"], 1);
}

#[tokio::test]
async fn test_success_false_is_an_error_even_on_200() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/stalls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failure("Stall map is not published")))
        .mount(&h.server)
        .await;

    let err = h
        .client
        .fetch::<Value>("/api/stalls", RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref m) if m == "Stall map is not published"));
}

#[tokio::test]
async fn test_error_without_message_uses_fallback() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/stalls"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&h.server)
        .await;

    let err = h
        .client
        .fetch::<Value>("/api/stalls", RequestOptions::get())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "Request failed");
}

#[tokio::test]
async fn test_logout_clears_session_even_when_backend_fails() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.logout().await;
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_logout_without_session_is_quiet() {
    let h = Harness::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.logout().await;
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_update_and_delete_current_user() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    let mut updated = user();
    updated["companyName"] = json!("Godage Books");

    Mock::given(method("PUT"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(json!({
            "firstName": "Vera",
            "lastName": "Silva",
            "companyName": "Godage Books",
            "mobileNo": "+94 77 123 4567"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(updated)))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Null)))
        .expect(1)
        .mount(&h.server)
        .await;

    let request = UpdateProfileRequest {
        first_name: "Vera".into(),
        last_name: "Silva".into(),
        company_name: "Godage Books".into(),
        mobile_no: "+94 77 123 4567".into(),
    };
    let profile = h.client.update_current_user(&request).await.unwrap();
    assert_eq!(profile.company_name.as_deref(), Some("Godage Books"));

    h.client.delete_current_user().await.unwrap();
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_password_reset_flow_is_unauthenticated() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    let mut sent = envelope(Value::Null);
    sent["message"] = json!("If the email exists, a reset link has been sent");

    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .and(body_json(json!({ "email": "v@x.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(sent))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/reset-password"))
        .and(body_json(json!({ "token": "reset-123", "newPassword": "n3w-secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Null)))
        .expect(1)
        .mount(&h.server)
        .await;

    let message = h.client.forgot_password("v@x.com").await.unwrap();
    assert_eq!(message, "If the email exists, a reset link has been sent");
    h.client.reset_password("reset-123", "n3w-secret").await.unwrap();

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.headers.get("authorization").is_none()));
}

#[tokio::test]
async fn test_context_bootstrap_without_credentials_is_offline() {
    let h = Harness::new().await;
    let context = AuthContext::new(h.client.clone());
    assert!(context.state().loading);

    assert!(context.bootstrap().await.is_none());
    assert!(!context.state().loading);
    assert_eq!(h.request_count().await, 0);
}

#[tokio::test]
async fn test_context_bootstrap_restores_user() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user())))
        .expect(1)
        .mount(&h.server)
        .await;

    let context = AuthContext::new(h.client.clone());
    let restored: UserProfile = context.bootstrap().await.unwrap();
    assert_eq!(restored.first_name, "Vera");
    assert!(context.is_authenticated());
    assert!(!context.state().loading);
}

#[tokio::test]
async fn test_context_bootstrap_failure_clears_session() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(404).set_body_json(failure("User not found")))
        .expect(1)
        .mount(&h.server)
        .await;

    let context = AuthContext::new(h.client.clone());
    assert!(context.bootstrap().await.is_none());
    assert!(!context.is_authenticated());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_context_login_and_logout() {
    let h = Harness::new().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_response("access-1", "refresh-1", 900_000)),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Null)))
        .expect(1)
        .mount(&h.server)
        .await;

    let context = AuthContext::new(h.client.clone());
    context.login("v@x.com", "secret123").await.unwrap();
    assert_eq!(context.user().unwrap().email, "v@x.com");

    context.logout().await;
    assert!(context.user().is_none());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_file_session_survives_client_restart() {
    let h = Harness::new().await;
    let dir = tempfile::TempDir::new().unwrap();
    let session_path = dir.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_response("access-1", "refresh-1", 900_000)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user())))
        .expect(1)
        .mount(&h.server)
        .await;

    let first = BookfairClient::builder()
        .base_url(h.server.uri())
        .session_store(Arc::new(FileSessionStore::new(&session_path)))
        .build()
        .unwrap();
    first.login("v@x.com", "secret123").await.unwrap();
    drop(first);

    let second = BookfairClient::builder()
        .base_url(h.server.uri())
        .session_store(Arc::new(FileSessionStore::new(&session_path)))
        .build()
        .unwrap();
    assert!(second.tokens().has_credentials());
    second.current_user().await.unwrap();
}

#[tokio::test]
async fn test_success_flag_may_be_omitted() {
    let h = Harness::new().await;
    h.seed_valid("access-1", "refresh-1");

    Mock::given(method("GET"))
        .and(path("/api/stalls/A1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "code": "A1" } })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let response = h
        .client
        .fetch::<Value>("/api/stalls/A1", RequestOptions::get())
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.data["code"], "A1");
}

#[tokio::test]
async fn test_short_reset_password_never_reaches_the_network() {
    let h = Harness::new().await;

    let err = h.client.reset_password("reset-123", "short").await.unwrap_err();
    assert!(
        matches!(err, ClientError::Validation(ref m) if m == "Password must be between 8 to 255 characters")
    );
    assert_eq!(h.request_count().await, 0);
}

#[tokio::test]
async fn test_bootstrap_with_only_refresh_token_renews_first() {
    let h = Harness::new().await;
    h.seed("", "refresh-1", 0);
    assert!(h.client.tokens().has_credentials());

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(refresh_response("access-2", "refresh-2")),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user())))
        .expect(1)
        .mount(&h.server)
        .await;

    let context = AuthContext::new(h.client.clone());
    assert!(context.bootstrap().await.is_some());
    assert!(context.is_authenticated());
}
