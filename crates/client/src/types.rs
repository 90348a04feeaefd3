//! Wire types shared by the portal API calls

use serde::{Deserialize, Serialize};

/// Response envelope returned by every backend endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Only an explicit `false` marks a failure
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
    #[serde(default)]
    pub timestamp: String,
}

const fn default_success() -> bool {
    true
}

/// Bearer token pair issued on login, register and refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in milliseconds
    #[serde(rename = "expiresIn")]
    pub expires_in_ms: i64,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in_ms", &self.expires_in_ms)
            .finish()
    }
}

/// Identity record of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    pub email: String,
    pub mobile_no: String,
    pub role: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl UserProfile {
    /// Name suitable for headers and greetings
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().filter(|s| !s.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Payload of login and register responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthData {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Payload of the refresh-token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshData {
    pub tokens: TokenPair,
}

/// Login request
#[derive(Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub email: String,
    pub mobile_no: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Refresh token request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Profile update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub mobile_no: String,
}

/// Forgot password request
#[derive(Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset password request
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}
