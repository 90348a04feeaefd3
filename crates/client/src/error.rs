//! Client error types

use thiserror::Error;

/// Fallback message used when the backend does not supply one
pub const FALLBACK_MESSAGE: &str = "Request failed";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request was rejected with 401 and no renewed token could be obtained,
    /// or the single retry was rejected again
    #[error("Unauthorized")]
    Unauthorized,

    /// Authentication failed on an endpoint that does not carry a session
    /// (wrong credentials on login, for example)
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Bad request
    #[error("{0}")]
    BadRequest(String),

    /// Forbidden
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Conflicting resource, e.g. an email that is already registered
    #[error("{0}")]
    Conflict(String),

    /// Server returned an error status
    #[error("{message}")]
    ServerError { status: u16, message: String },

    /// Transport succeeded but the envelope carried `success: false`
    #[error("{0}")]
    Rejected(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session store could not be read or written
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status carried by the error, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized | Self::AuthenticationFailed(_) => Some(401),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::ServerError { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the caller has to sign in again
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
