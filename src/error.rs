//! Client error taxonomy.
//!
//! DESIGN
//! ======
//! Business rejections (`success: false` envelopes), HTTP-level failures and
//! transport failures stay distinct so the auth store can pick the message it
//! shows and the gateway can recognize credential rejections.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Errors produced by gateway requests and session actions.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// The backend answered 2xx but the envelope reported `success: false`.
    #[error("request rejected: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// A successful envelope lacked a field the caller needs.
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),

    /// The response body was not the expected JSON shape.
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A logout or newer login landed while this action was in flight.
    #[error("session changed while the request was in flight")]
    Superseded,

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ClientError {
    /// Message supplied by the backend in the response envelope, if any.
    #[must_use]
    pub fn payload_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Rejected { message } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Human-readable message for the session: the backend's message or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.payload_message().unwrap_or(fallback).to_owned()
    }

    /// True for HTTP 401/403, the statuses that invalidate local credentials.
    #[must_use]
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if is_credential_rejection_status(*status))
    }
}

/// Statuses that mean the server no longer accepts the held credentials.
#[must_use]
pub fn is_credential_rejection_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}
