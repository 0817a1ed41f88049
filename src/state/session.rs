//! Auth-session state shared by the auth store, the gateway and the route guard.
//!
//! DESIGN
//! ======
//! One `SessionHandle` is created at startup from durable storage and cloned
//! into every collaborator; clones share the same state. The token slot is
//! written under the state lock so memory and storage never disagree. Locks
//! are never held across an await point.
//!
//! STALE COMPLETIONS
//! =================
//! Actions suspend on network I/O, so a completion may land after the session
//! has moved on. Every credential change bumps `epoch`. Explicit logouts and
//! token installs also bump `generation`, and token installs bump `logins`.
//! Dropping a token the backend rejected changes `epoch` only. An action
//! takes a [`Ticket`] when it starts:
//! - a fetch-user completion applies only if `epoch` is unchanged,
//! - a login installs its token only if `generation` is unchanged,
//! - a login failure tears down only if no newer token was installed.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::ClientError;
use crate::net::types::User;
use crate::util::token_persistence::TokenStorage;

/// Lifecycle status of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Authenticated,
    Success,
    Error,
}

/// Point-in-time copy of the session.
///
/// `status == Authenticated` implies both `token` and `user` are present.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    pub status: SessionStatus,
    pub error_message: String,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.status == SessionStatus::Authenticated
    }
}

/// Marker taken when an action starts; see the module docs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ticket {
    epoch: u64,
    generation: u64,
    logins: u64,
}

struct SessionState {
    session: Session,
    epoch: u64,
    generation: u64,
    logins: u64,
}

impl SessionState {
    fn ticket(&self) -> Ticket {
        Ticket { epoch: self.epoch, generation: self.generation, logins: self.logins }
    }

    fn reset(&mut self) {
        self.session.token = None;
        self.session.user = None;
        self.epoch += 1;
    }
}

struct SessionInner {
    state: RwLock<SessionState>,
    storage: Arc<dyn TokenStorage>,
}

/// Shared handle to the single client session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("SessionHandle")
            .field("has_token", &state.session.token.is_some())
            .field("user", &state.session.user.as_ref().map(|u| &u.username))
            .field("status", &state.session.status)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Create the session from durable storage: persisted token, no user, idle.
    pub fn restore(storage: Arc<dyn TokenStorage>) -> Self {
        let token = storage.load();
        tracing::debug!(has_token = token.is_some(), "session restored");
        let session = Session { token, ..Session::default() };
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState { session, epoch: 0, generation: 0, logins: 0 }),
                storage,
            }),
        }
    }

    // =========================================================================
    // READERS
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.read().session.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.state.read().session.token.clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.state.read().session.status
    }

    #[must_use]
    pub fn error_message(&self) -> String {
        self.inner.state.read().session.error_message.clone()
    }

    /// Token present and status is `Authenticated`.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read().session.is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.read().session.user.clone()
    }

    /// Counts credential changes since startup.
    #[cfg(test)]
    pub(crate) fn epoch(&self) -> u64 {
        self.inner.state.read().epoch
    }

    // =========================================================================
    // PUBLIC MUTATORS
    // =========================================================================

    /// Clear token and user, reset to idle and remove the persisted token.
    /// Safe to call when already logged out.
    pub fn logout(&self) {
        let mut state = self.inner.state.write();
        state.generation += 1;
        self.drop_credentials_locked(&mut state);
        tracing::info!("session logged out");
    }

    fn drop_credentials_locked(&self, state: &mut SessionState) {
        state.reset();
        state.session.status = SessionStatus::Idle;
        self.inner.storage.clear();
    }

    /// Clear the stored error message only.
    pub fn clear_error(&self) {
        self.inner.state.write().session.error_message.clear();
    }

    // =========================================================================
    // ACTION STEPS
    // =========================================================================

    /// Start a register/login: status `Loading`, error cleared.
    pub(crate) fn begin_action(&self) -> Ticket {
        let mut state = self.inner.state.write();
        state.session.status = SessionStatus::Loading;
        state.session.error_message.clear();
        state.ticket()
    }

    /// Start a fetch-user. `None` (and no state change) when no token is held.
    pub(crate) fn begin_fetch(&self) -> Option<Ticket> {
        let mut state = self.inner.state.write();
        state.session.token.as_ref()?;
        state.session.status = SessionStatus::Loading;
        Some(state.ticket())
    }

    pub(crate) fn mark_success(&self) {
        self.inner.state.write().session.status = SessionStatus::Success;
    }

    /// Record a failed action that holds no credentials of its own.
    pub(crate) fn mark_error(&self, message: String) {
        let mut state = self.inner.state.write();
        state.session.status = SessionStatus::Error;
        state.session.error_message = message;
    }

    /// Store and persist a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Superseded`] if an explicit logout or another
    /// login landed since `ticket` was taken.
    pub(crate) fn install_token(&self, ticket: Ticket, token: String) -> Result<Ticket, ClientError> {
        let mut state = self.inner.state.write();
        if state.generation != ticket.generation {
            return Err(ClientError::Superseded);
        }
        self.inner.storage.save(&token);
        state.session.token = Some(token);
        state.session.status = SessionStatus::Success;
        state.epoch += 1;
        state.generation += 1;
        state.logins += 1;
        Ok(state.ticket())
    }

    /// Store the fetched user. Returns `false` when the completion is stale.
    pub(crate) fn complete_fetch(&self, ticket: Ticket, user: User) -> bool {
        let mut state = self.inner.state.write();
        if state.epoch != ticket.epoch || state.session.token.is_none() {
            return false;
        }
        state.session.user = Some(user);
        state.session.status = SessionStatus::Authenticated;
        true
    }

    /// Replace the stored user after a profile update. Stale results are dropped.
    pub(crate) fn replace_user(&self, ticket: Ticket, user: User) -> bool {
        let mut state = self.inner.state.write();
        if state.epoch != ticket.epoch || state.session.token.is_none() {
            return false;
        }
        state.session.user = Some(user);
        true
    }

    /// Ticket for an action that does not change status.
    pub(crate) fn ticket(&self) -> Ticket {
        self.inner.state.read().ticket()
    }

    /// Drop the credentials unless the session already moved past `ticket`.
    ///
    /// A login in flight is not superseded by this.
    pub(crate) fn logout_if_current(&self, ticket: Ticket) -> bool {
        let mut state = self.inner.state.write();
        if state.epoch != ticket.epoch {
            return false;
        }
        self.drop_credentials_locked(&mut state);
        tracing::info!("session credentials dropped");
        true
    }

    /// Drop the credentials after the backend rejected `attached`, the token
    /// a request carried (`None` for an anonymous request). Skipped when the
    /// session already holds a different token.
    pub(crate) fn reject_token(&self, attached: Option<&str>) -> bool {
        let mut state = self.inner.state.write();
        if state.session.token.as_deref() != attached {
            return false;
        }
        self.drop_credentials_locked(&mut state);
        tracing::info!("rejected token dropped");
        true
    }

    /// Record a failed login and tear the session down.
    ///
    /// Skipped entirely when a newer login installed a token after `ticket`.
    pub(crate) fn fail_login(&self, ticket: Ticket, message: String) -> bool {
        let mut state = self.inner.state.write();
        if state.logins != ticket.logins {
            return false;
        }
        state.reset();
        state.session.status = SessionStatus::Error;
        state.session.error_message = message;
        self.inner.storage.clear();
        true
    }
}
