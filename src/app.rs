//! Application wiring: one session shared by the gateway, auth store and router.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::net::gateway::ApiGateway;
use crate::router::guard::{NavigationGuard, Notifier, TracingNotifier};
use crate::router::navigator::Router;
use crate::router::routes::RouteTable;
use crate::state::auth::AuthStore;
use crate::state::session::SessionHandle;
use crate::util::token_persistence::{FileTokenStorage, TokenStorage};

pub struct App {
    pub auth: AuthStore,
    pub router: Router,
}

impl App {
    /// Restore the session from `storage` and bind every component to it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn bootstrap(
        config: &ClientConfig,
        storage: Arc<dyn TokenStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let session = SessionHandle::restore(storage);
        let gateway = ApiGateway::new(config)?.with_session(session.clone());
        let auth = AuthStore::new(session.clone(), gateway);
        let router = Router::new(RouteTable::campus_guide(), NavigationGuard::new(session, notifier));
        tracing::debug!(base_url = %config.api_base_url, "client wired");
        Ok(Self { auth, router })
    }

    /// [`App::bootstrap`] with the token file under `config.token_dir`.
    ///
    /// # Errors
    ///
    /// As [`App::bootstrap`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let storage = Arc::new(FileTokenStorage::in_dir(&config.token_dir));
        Self::bootstrap(config, storage, Arc::new(TracingNotifier))
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        self.auth.session()
    }

    /// Load the user for a restored token. No-op without a token.
    ///
    /// # Errors
    ///
    /// Whatever [`AuthStore::fetch_user`] raises; a rejected token has already
    /// been cleared by then.
    pub async fn refresh_user(&self) -> Result<(), ClientError> {
        if self.session().token().is_none() {
            return Ok(());
        }
        self.auth.fetch_user().await
    }
}
