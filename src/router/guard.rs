//! Navigation guard run before every route transition.
//!
//! SYSTEM CONTEXT
//! ==============
//! This guard gates pages for UX only; the backend still authorizes every
//! request. The authentication check runs before the admin check, and the
//! admin check tolerates a missing user record even when the session claims
//! to be authenticated.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::Arc;

use super::routes::{HOME_ROUTE, LOGIN_ROUTE, ResolvedRoute, RouteMeta};
use crate::net::types::User;
use crate::state::session::SessionHandle;

pub const APP_TITLE: &str = "Campus Plant Guide";
pub const ACCESS_DENIED_MESSAGE: &str = "You do not have permission to access this page!";

/// Session predicates the guard depends on.
pub trait SessionView {
    fn is_authenticated(&self) -> bool;
    fn current_user(&self) -> Option<User>;
}

impl SessionView for SessionHandle {
    fn is_authenticated(&self) -> bool {
        SessionHandle::is_authenticated(self)
    }

    fn current_user(&self) -> Option<User> {
        SessionHandle::current_user(self)
    }
}

// =============================================================================
// NOTICES
// =============================================================================

/// Blocking message shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    AccessDenied { path: String },
}

impl Notice {
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => ACCESS_DENIED_MESSAGE,
        }
    }
}

/// Delivery channel for [`Notice`]s.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Emits notices as warnings on the tracing pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::AccessDenied { path } => tracing::warn!(%path, "{}", notice.message()),
        }
    }
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectReason {
    Unauthenticated,
    Forbidden,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Abort the attempt and navigate to the named route instead.
    Redirect { to: &'static str, reason: RedirectReason },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardOutcome {
    pub title: String,
    pub decision: GuardDecision,
}

/// `"<title> - Campus Plant Guide"`, or the bare app title when the route has none.
#[must_use]
pub fn page_title(meta: &RouteMeta) -> String {
    match meta.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => format!("{title} - {APP_TITLE}"),
        _ => APP_TITLE.to_owned(),
    }
}

pub struct NavigationGuard<S: SessionView = SessionHandle> {
    session: S,
    notifier: Arc<dyn Notifier>,
}

impl<S: SessionView> NavigationGuard<S> {
    pub fn new(session: S, notifier: Arc<dyn Notifier>) -> Self {
        Self { session, notifier }
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Decide one navigation attempt from `from` to `to`. Never fails.
    pub fn check(&self, to: &ResolvedRoute, from: Option<&ResolvedRoute>) -> GuardOutcome {
        let title = page_title(&to.meta);
        let decision = self.decide(to);
        tracing::debug!(
            to = %to.path,
            from = from.map_or("-", |r| r.path.as_str()),
            ?decision,
            "navigation guard"
        );
        GuardOutcome { title, decision }
    }

    fn decide(&self, to: &ResolvedRoute) -> GuardDecision {
        if to.meta.requires_auth && !self.session.is_authenticated() {
            return GuardDecision::Redirect { to: LOGIN_ROUTE, reason: RedirectReason::Unauthenticated };
        }
        if to.meta.requires_admin && !self.session.current_user().is_some_and(|u| u.is_admin()) {
            self.notifier.notify(&Notice::AccessDenied { path: to.path.clone() });
            return GuardDecision::Redirect { to: HOME_ROUTE, reason: RedirectReason::Forbidden };
        }
        GuardDecision::Allow
    }
}
