//! Book-fair portal API client
//!
//! Talks to the stall reservation backend on behalf of the vendor and
//! employee portals. Every authorized call goes through
//! [`BookfairClient::fetch`], which attaches the current access token and
//! renews it through the [`TokenManager`] when it expires or the backend
//! answers 401.

pub mod auth;
pub mod client;
pub mod clock;
pub mod context;
pub mod error;
pub mod forms;
pub mod session;
pub mod tokens;
pub mod types;
pub mod users;

pub use client::{BookfairClient, BookfairClientBuilder, RequestOptions};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AuthContext, AuthState};
pub use error::ClientError;
pub use forms::{RegistrationForm, ValidationError};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};
pub use tokens::TokenManager;
pub use types::{ApiResponse, AuthData, RegisterRequest, TokenPair, UpdateProfileRequest, UserProfile};
