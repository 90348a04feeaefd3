//! Current-user API client methods

use crate::client::{BookfairClient, RequestOptions};
use crate::error::ClientError;
use crate::types::{UpdateProfileRequest, UserProfile};
use serde_json::Value;
use tracing::info;

const ME_PATH: &str = "/api/users/me";

impl BookfairClient {
    /// Profile of the signed-in user
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let response = self
            .fetch::<UserProfile>(ME_PATH, RequestOptions::get())
            .await?;
        Ok(response.data)
    }

    /// Update the signed-in user's profile
    pub async fn update_current_user(
        &self,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile, ClientError> {
        let options = RequestOptions::put().json(request)?;
        let response = self.fetch::<UserProfile>(ME_PATH, options).await?;
        Ok(response.data)
    }

    /// Delete the signed-in user's account and forget the local session
    pub async fn delete_current_user(&self) -> Result<(), ClientError> {
        self.fetch::<Option<Value>>(ME_PATH, RequestOptions::delete())
            .await?;
        self.clear_session();
        info!("Account deleted");
        Ok(())
    }
}
