//! Shared request pipeline for the REST backend.
//!
//! ARCHITECTURE
//! ============
//! Every network call goes through one `ApiGateway`:
//! - outgoing: the bearer token held by the injected session (if any) is
//!   attached as `Authorization: Bearer <token>`;
//! - incoming: 2xx bodies are decoded as an [`ApiEnvelope`]; a 401/403 drops
//!   the session's credentials before the error is returned to the caller,
//!   unless the session already moved on to a different token.
//!
//! ERROR HANDLING
//! ==============
//! The gateway never swallows a failure. Its only side effect is dropping the
//! rejected token.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::ApiEnvelope;
use crate::config::ClientConfig;
use crate::error::{ClientError, is_credential_rejection_status};
use crate::state::session::SessionHandle;

#[derive(Clone, Debug)]
pub struct ApiGateway {
    http: reqwest::Client,
    base_url: String,
    session: Option<SessionHandle>,
}

impl ApiGateway {
    /// Build an anonymous gateway for `config.api_base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ClientError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_owned(), session: None })
    }

    /// Bind the session whose token is attached and which is logged out on 401/403.
    #[must_use]
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}{path}`.
    ///
    /// # Errors
    ///
    /// Transport, non-2xx status and body decode failures.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiEnvelope<T>, ClientError> {
        self.send(self.http.get(self.endpoint(path))).await
    }

    /// `POST {base}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Transport, non-2xx status and body decode failures.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.post(self.endpoint(path)).json(body)).await
    }

    /// `PUT {base}{path}` with a JSON body.
    ///
    /// # Errors
    ///
    /// Transport, non-2xx status and body decode failures.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiEnvelope<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.http.put(self.endpoint(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<ApiEnvelope<T>, ClientError> {
        let token = self.session.as_ref().and_then(SessionHandle::token);
        let response = attach_credentials(request, token.as_deref()).send().await?;
        self.screen_response(response, token.as_deref()).await
    }

    // =========================================================================
    // INTERCEPTORS
    // =========================================================================

    /// `attached` is the token the request carried.
    async fn screen_response<T: DeserializeOwned>(
        &self,
        response: Response,
        attached: Option<&str>,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            return Ok(serde_json::from_str(&text)?);
        }

        let code = status.as_u16();
        if is_credential_rejection_status(code) {
            tracing::warn!(status = code, url = %response.url().path(), "credentials rejected");
            if let Some(session) = &self.session {
                if !session.reject_token(attached) {
                    tracing::debug!("session moved to a newer token; keeping it");
                }
            }
        }

        let text = response.text().await.unwrap_or_default();
        Err(ClientError::Status { status: code, message: parse_error_message(&text) })
    }
}

fn attach_credentials(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Pull `message` out of an error body shaped like an envelope.
fn parse_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(ToOwned::to_owned)
}
