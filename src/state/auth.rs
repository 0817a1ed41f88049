//! Auth actions for the current user: register, login, logout, fetch-user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages call these actions; the route guard only reads the resulting
//! session. Every action records its outcome on the shared session before
//! returning, and failures are always re-raised to the caller after local
//! recovery. There is no retry policy here.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use super::session::{Session, SessionHandle, Ticket};
use crate::error::ClientError;
use crate::net::api;
use crate::net::gateway::ApiGateway;
use crate::net::types::{LoginCredentials, PasswordChange, ProfileUpdate, RegisterCredentials, User};

pub const REGISTER_FALLBACK_MESSAGE: &str = "An unknown error occurred during registration";
pub const LOGIN_FALLBACK_MESSAGE: &str = "An unknown error occurred during login";

/// Session actions bound to one gateway.
#[derive(Clone, Debug)]
pub struct AuthStore {
    session: SessionHandle,
    gateway: ApiGateway,
}

impl AuthStore {
    /// `gateway` should be bound to the same `session`.
    #[must_use]
    pub fn new(session: SessionHandle, gateway: ApiGateway) -> Self {
        Self { session, gateway }
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[must_use]
    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    /// Create an account. Sets no token.
    ///
    /// # Errors
    ///
    /// Re-raises the gateway or envelope failure after recording it on the session.
    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<bool, ClientError> {
        self.session.begin_action();
        match api::register(&self.gateway, credentials).await {
            Ok(()) => {
                self.session.mark_success();
                tracing::info!(username = %credentials.username, "registration accepted");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "registration failed");
                self.session.mark_error(e.user_message(REGISTER_FALLBACK_MESSAGE));
                Err(e)
            }
        }
    }

    /// Exchange credentials for a token, persist it, then load the user.
    ///
    /// # Errors
    ///
    /// Any failure, including of the chained user fetch, clears token and user,
    /// records the message and is re-raised. [`ClientError::Superseded`] means a
    /// logout or another login landed first; the session is left to that action.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(), ClientError> {
        let mut ticket = self.session.begin_action();
        let result = self.login_steps(credentials, &mut ticket).await;
        match &result {
            Ok(()) => tracing::info!(identifier = %credentials.identifier, "login succeeded"),
            Err(ClientError::Superseded) => {
                tracing::debug!(identifier = %credentials.identifier, "login superseded");
            }
            Err(e) => {
                tracing::warn!(identifier = %credentials.identifier, error = %e, "login failed");
                self.session.fail_login(ticket, e.user_message(LOGIN_FALLBACK_MESSAGE));
            }
        }
        result
    }

    async fn login_steps(&self, credentials: &LoginCredentials, ticket: &mut Ticket) -> Result<(), ClientError> {
        let token = api::login(&self.gateway, credentials).await?;
        *ticket = self.session.install_token(*ticket, token)?;
        self.fetch_user().await
    }

    /// Drop the local session. Never contacts the backend.
    pub fn logout(&self) {
        self.session.logout();
    }

    /// Load the user for the held token. No-op without a token.
    ///
    /// # Errors
    ///
    /// Any failure logs the session out (unless it already moved on) and is
    /// re-raised. [`ClientError::Superseded`] when a logout or newer login
    /// landed while the request was in flight; the result is discarded.
    pub async fn fetch_user(&self) -> Result<(), ClientError> {
        let Some(ticket) = self.session.begin_fetch() else {
            return Ok(());
        };
        match api::fetch_current_user(&self.gateway).await {
            Ok(user) => {
                if self.session.complete_fetch(ticket, user) {
                    Ok(())
                } else {
                    tracing::debug!("discarding stale current-user response");
                    Err(ClientError::Superseded)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "current-user request failed; clearing session");
                self.session.logout_if_current(ticket);
                Err(e)
            }
        }
    }

    /// Clear the stored error message.
    pub fn clear_error(&self) {
        self.session.clear_error();
    }

    /// Update nickname/email and store the returned user.
    ///
    /// # Errors
    ///
    /// Gateway or envelope failures. A 401/403 logs out through the gateway.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        let ticket = self.session.ticket();
        let user = api::update_profile(&self.gateway, update).await?;
        if !self.session.replace_user(ticket, user.clone()) {
            tracing::debug!("discarding stale profile update");
        }
        Ok(user)
    }

    /// Change the password of the signed-in user. The session is unchanged.
    ///
    /// # Errors
    ///
    /// Gateway or envelope failures. A 401/403 logs out through the gateway.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ClientError> {
        api::change_password(&self.gateway, change).await
    }
}
