//! Router: resolves locations, runs the guard and commits the current route.
//!
//! Each attempt runs the guard exactly once. A guard redirect aborts the
//! attempt and starts a new one for the redirect target, so the target's own
//! metadata is checked too. Static redirects from the table are applied
//! before the guard sees the route.

#[cfg(test)]
#[path = "navigator_test.rs"]
mod navigator_test;

use std::collections::BTreeMap;

use super::NavigationError;
use super::guard::{APP_TITLE, GuardDecision, NavigationGuard, RedirectReason, SessionView};
use super::routes::{ResolvedRoute, RouteTable};
use crate::state::session::SessionHandle;

/// Hops (static or guard redirects) allowed for a single navigation.
pub const MAX_REDIRECTS: usize = 10;

/// A committed navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub route: ResolvedRoute,
    pub title: String,
    /// Location originally requested, when a redirect changed it.
    pub redirected_from: Option<String>,
    /// Why the last guard redirect happened, if one did.
    pub redirect_reason: Option<RedirectReason>,
}

pub struct Router<S: SessionView = SessionHandle> {
    routes: RouteTable,
    guard: NavigationGuard<S>,
    current: Option<ResolvedRoute>,
    title: String,
}

impl<S: SessionView> Router<S> {
    pub fn new(routes: RouteTable, guard: NavigationGuard<S>) -> Self {
        Self { routes, guard, current: None, title: APP_TITLE.to_owned() }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn current(&self) -> Option<&ResolvedRoute> {
        self.current.as_ref()
    }

    /// Document title of the committed route.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Navigate to `location` (path with optional query).
    ///
    /// # Errors
    ///
    /// [`NavigationError::NotFound`] for unmatched locations and
    /// [`NavigationError::TooManyRedirects`] for redirect cycles. The current
    /// route is left unchanged on error.
    pub fn push(&mut self, location: &str) -> Result<Navigation, NavigationError> {
        let target = self
            .routes
            .resolve(location)
            .ok_or_else(|| NavigationError::NotFound(location.to_owned()))?;
        self.navigate(location, target)
    }

    /// Navigate to the route called `name`.
    ///
    /// # Errors
    ///
    /// [`NavigationError::UnknownRouteName`] if no route has that name or a
    /// parameter is missing; otherwise as [`Router::push`].
    pub fn push_named(&mut self, name: &str, params: &BTreeMap<String, String>) -> Result<Navigation, NavigationError> {
        let target = self
            .routes
            .resolve_named(name, params)
            .ok_or_else(|| NavigationError::UnknownRouteName(name.to_owned()))?;
        let requested = target.full_path();
        self.navigate(&requested, target)
    }

    fn navigate(&mut self, requested: &str, mut target: ResolvedRoute) -> Result<Navigation, NavigationError> {
        let mut hops = 0;
        let mut redirect_reason = None;
        loop {
            if let Some(to) = target.redirect.clone() {
                target = self.hop(&mut hops, requested, |routes| routes.resolve(&to), &to)?;
                continue;
            }

            let outcome = self.guard.check(&target, self.current.as_ref());
            match outcome.decision {
                GuardDecision::Allow => {
                    let redirected_from = (hops > 0).then(|| requested.to_owned());
                    self.title = outcome.title.clone();
                    self.current = Some(target.clone());
                    return Ok(Navigation { route: target, title: outcome.title, redirected_from, redirect_reason });
                }
                GuardDecision::Redirect { to, reason } => {
                    redirect_reason = Some(reason);
                    target = self.hop(&mut hops, requested, |routes| routes.resolve_named(to, &BTreeMap::new()), to)?;
                }
            }
        }
    }

    fn hop<F>(&self, hops: &mut usize, requested: &str, resolve: F, to: &str) -> Result<ResolvedRoute, NavigationError>
    where
        F: FnOnce(&RouteTable) -> Option<ResolvedRoute>,
    {
        *hops += 1;
        if *hops > MAX_REDIRECTS {
            return Err(NavigationError::TooManyRedirects(requested.to_owned()));
        }
        resolve(&self.routes).ok_or_else(|| NavigationError::NotFound(to.to_owned()))
    }
}
