//! In-memory authentication state of a running portal session

use crate::client::BookfairClient;
use crate::error::ClientError;
use crate::forms::RegistrationForm;
use crate::types::{UpdateProfileRequest, UserProfile};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Authentication state as seen by the UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true, // until bootstrap has checked the stored session
        }
    }
}

/// Authentication state transitions
#[derive(Debug)]
pub enum AuthAction {
    SignedIn(UserProfile),
    ProfileUpdated(UserProfile),
    SignedOut,
    SetLoading(bool),
}

impl AuthState {
    fn reduce(&self, action: AuthAction) -> Self {
        match action {
            AuthAction::SignedIn(user) => Self {
                user: Some(user),
                loading: false,
            },
            AuthAction::ProfileUpdated(user) => Self {
                user: Some(user),
                ..self.clone()
            },
            AuthAction::SignedOut => Self {
                user: None,
                loading: false,
            },
            AuthAction::SetLoading(loading) => Self {
                loading,
                ..self.clone()
            },
        }
    }
}

/// Keeps the signed-in user alongside the client that authenticates them.
///
/// The user profile only lives here; it is never written to the session store.
pub struct AuthContext {
    client: BookfairClient,
    state: RwLock<AuthState>,
}

impl AuthContext {
    pub fn new(client: BookfairClient) -> Self {
        Self {
            client,
            state: RwLock::new(AuthState::default()),
        }
    }

    pub fn client(&self) -> &BookfairClient {
        &self.client
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().user.is_some()
    }

    fn dispatch(&self, action: AuthAction) {
        debug!(?action, "Auth state transition");
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = state.reduce(action);
    }

    /// Restore the signed-in user from a stored session.
    ///
    /// Without stored credentials this finishes immediately. If the profile
    /// cannot be loaded the stored session is discarded.
    pub async fn bootstrap(&self) -> Option<UserProfile> {
        if !self.client.tokens().has_credentials() {
            self.dispatch(AuthAction::SignedOut);
            return None;
        }

        self.dispatch(AuthAction::SetLoading(true));
        match self.client.current_user().await {
            Ok(user) => {
                self.dispatch(AuthAction::SignedIn(user.clone()));
                Some(user)
            }
            Err(e) => {
                warn!("Could not restore session, signing out: {}", e);
                self.client.clear_session();
                self.dispatch(AuthAction::SignedOut);
                None
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let data = self.client.login(email, password).await?;
        self.dispatch(AuthAction::SignedIn(data.user.clone()));
        Ok(data.user)
    }

    /// Validate the form, then register. An invalid form is rejected before
    /// any request is made.
    pub async fn register(&self, form: &RegistrationForm) -> Result<UserProfile, ClientError> {
        let request = form.validate()?;
        let data = self.client.register(&request).await?;
        self.dispatch(AuthAction::SignedIn(data.user.clone()));
        Ok(data.user)
    }

    pub async fn logout(&self) {
        self.client.logout().await;
        self.dispatch(AuthAction::SignedOut);
    }

    /// Reload the profile from the backend
    pub async fn refresh_user(&self) -> Result<UserProfile, ClientError> {
        let user = self.client.current_user().await?;
        self.dispatch(AuthAction::ProfileUpdated(user.clone()));
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile, ClientError> {
        request.validate()?;
        let user = self.client.update_current_user(request).await?;
        self.dispatch(AuthAction::ProfileUpdated(user.clone()));
        Ok(user)
    }

    pub async fn delete_account(&self) -> Result<(), ClientError> {
        self.client.delete_current_user().await?;
        self.dispatch(AuthAction::SignedOut);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            first_name: "Vera".into(),
            last_name: None,
            company_name: None,
            email: "v@x.com".into(),
            mobile_no: "0771234567".into(),
            role: "VENDOR".into(),
            status: "ACTIVE".into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_starts_loading() {
        let state = AuthState::default();
        assert!(state.loading);
        assert!(state.user.is_none());
    }

    #[test]
    fn test_reduce_sign_in_and_out() {
        let signed_in = AuthState::default().reduce(AuthAction::SignedIn(user()));
        assert_eq!(signed_in.user, Some(user()));
        assert!(!signed_in.loading);

        let loading = signed_in.reduce(AuthAction::SetLoading(true));
        assert!(loading.loading);
        assert_eq!(loading.user, Some(user()));

        let signed_out = loading.reduce(AuthAction::SignedOut);
        assert_eq!(signed_out, AuthState { user: None, loading: false });
    }

    #[test]
    fn test_profile_update_keeps_loading_flag() {
        let state = AuthState::default();
        let mut renamed = user();
        renamed.first_name = "Veronica".into();
        let updated = state.reduce(AuthAction::ProfileUpdated(renamed.clone()));
        assert!(updated.loading);
        assert_eq!(updated.user, Some(renamed));
    }
}
