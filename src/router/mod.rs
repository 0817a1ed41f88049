//! Client-side routing: route table, navigation guard and router.

pub mod guard;
pub mod navigator;
pub mod routes;

pub use guard::{NavigationGuard, Notice, Notifier, SessionView, TracingNotifier};
pub use navigator::{Navigation, Router};
pub use routes::{ResolvedRoute, RouteDescriptor, RouteTable, View};

/// Errors produced while resolving a navigation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// No route matches the location.
    #[error("no route matches '{0}'")]
    NotFound(String),

    /// No route carries the name, or a path parameter is missing.
    #[error("unknown route name '{0}'")]
    UnknownRouteName(String),

    /// Redirects did not settle.
    #[error("too many redirects while navigating to '{0}'")]
    TooManyRedirects(String),
}
