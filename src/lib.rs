//! Client core for the campus plant guide.
//!
//! A single [`state::session::SessionHandle`] holds the bearer token, the
//! current user and the status of the last auth action. The HTTP gateway
//! attaches the token and drops the session on credential rejection, the
//! auth store drives register/login/logout/fetch-user, and the router's
//! navigation guard gates pages on the same session.

pub mod app;
pub mod config;
pub mod error;
pub mod net;
pub mod router;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_helpers;

pub use app::App;
pub use config::ClientConfig;
pub use error::ClientError;
pub use router::NavigationError;
pub use state::auth::AuthStore;
pub use state::session::{Session, SessionHandle, SessionStatus};
