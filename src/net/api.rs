//! Typed wrappers for the backend endpoints the session layer uses.
//!
//! Each function issues one request through the [`ApiGateway`] and unwraps the
//! response envelope, turning `success: false` into [`ClientError::Rejected`].

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde_json::Value;

use super::gateway::ApiGateway;
use super::types::{AccessToken, LoginCredentials, PasswordChange, ProfileUpdate, RegisterCredentials, User};
use crate::error::ClientError;

pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGIN_PATH: &str = "/auth/login";
pub const CURRENT_USER_PATH: &str = "/users/me";
pub const PASSWORD_PATH: &str = "/users/me/password";

/// `POST /auth/register`. Issues no token.
///
/// # Errors
///
/// Gateway failures, or [`ClientError::Rejected`] when the backend refuses.
pub async fn register(gateway: &ApiGateway, credentials: &RegisterCredentials) -> Result<(), ClientError> {
    gateway
        .post::<_, Value>(REGISTER_PATH, credentials)
        .await?
        .into_result()
        .map(|_| ())
}

/// `POST /auth/login`, returning `data.accessToken`.
///
/// # Errors
///
/// Gateway failures, [`ClientError::Rejected`], or [`ClientError::MissingField`]
/// when the envelope carries no token.
pub async fn login(gateway: &ApiGateway, credentials: &LoginCredentials) -> Result<String, ClientError> {
    let token: AccessToken = gateway
        .post::<_, AccessToken>(LOGIN_PATH, credentials)
        .await?
        .into_data()?;
    if token.access_token.is_empty() {
        return Err(ClientError::MissingField("accessToken"));
    }
    Ok(token.access_token)
}

/// `GET /users/me`.
///
/// # Errors
///
/// Gateway failures, [`ClientError::Rejected`], or a missing `data` record.
pub async fn fetch_current_user(gateway: &ApiGateway) -> Result<User, ClientError> {
    gateway.get::<User>(CURRENT_USER_PATH).await?.into_data()
}

/// `PUT /users/me`, returning the updated record.
///
/// # Errors
///
/// Gateway failures, [`ClientError::Rejected`], or a missing `data` record.
pub async fn update_profile(gateway: &ApiGateway, update: &ProfileUpdate) -> Result<User, ClientError> {
    gateway
        .put::<_, User>(CURRENT_USER_PATH, update)
        .await?
        .into_data()
}

/// `PUT /users/me/password`.
///
/// # Errors
///
/// Gateway failures or [`ClientError::Rejected`].
pub async fn change_password(gateway: &ApiGateway, change: &PasswordChange) -> Result<(), ClientError> {
    gateway
        .put::<_, Value>(PASSWORD_PATH, change)
        .await?
        .into_result()
        .map(|_| ())
}
