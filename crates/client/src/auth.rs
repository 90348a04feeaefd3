//! Authentication API client methods

use crate::client::{BookfairClient, RequestOptions};
use crate::error::ClientError;
use crate::types::{
    AuthData, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
};
use serde_json::Value;
use tracing::{info, warn};

impl BookfairClient {
    /// Sign in and persist the issued token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthData, ClientError> {
        let options = RequestOptions::post()
            .skip_auth()
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })?;
        let response = self.fetch::<AuthData>("/api/auth/login", options).await?;

        self.tokens().store_tokens(&response.data.tokens)?;
        info!(user_id = %response.data.user.id, "Signed in");
        Ok(response.data)
    }

    /// Create an account and persist the issued token pair
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthData, ClientError> {
        let options = RequestOptions::post().skip_auth().json(request)?;
        let response = self.fetch::<AuthData>("/api/auth/register", options).await?;

        self.tokens().store_tokens(&response.data.tokens)?;
        info!(user_id = %response.data.user.id, "Registered");
        Ok(response.data)
    }

    /// Revoke the session on the backend and forget it locally.
    ///
    /// Backend failures are logged and ignored; the local session is always
    /// cleared.
    pub async fn logout(&self) {
        if let Err(e) = self
            .fetch::<Option<Value>>("/api/auth/logout", RequestOptions::post())
            .await
        {
            warn!("Logout request failed, clearing local session anyway: {}", e);
        }
        self.clear_session();
        info!("Signed out");
    }

    /// Ask the backend to send a password reset link
    pub async fn forgot_password(&self, email: &str) -> Result<String, ClientError> {
        let options = RequestOptions::post()
            .skip_auth()
            .json(&ForgotPasswordRequest {
                email: email.to_string(),
            })?;
        let response = self
            .fetch::<Option<Value>>("/api/auth/forgot-password", options)
            .await?;
        Ok(response.message)
    }

    /// Set a new password using a reset token. The new password is checked
    /// locally before the backend is called.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        let request = ResetPasswordRequest {
            token: token.trim().to_string(),
            new_password: new_password.to_string(),
        };
        request.validate()?;

        let options = RequestOptions::post().skip_auth().json(&request)?;
        let response = self
            .fetch::<Option<Value>>("/api/auth/reset-password", options)
            .await?;
        Ok(response.message)
    }
}
