//! Client configuration parsed from environment variables.

use std::path::PathBuf;

use crate::error::ClientError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const BASE_URL_VAR: &str = "GREENFRIENDS_API_BASE_URL";
pub const TOKEN_DIR_VAR: &str = "GREENFRIENDS_TOKEN_DIR";

const TOKEN_DIR_NAME: &str = "greenfriends";

/// Values given explicitly (command-line flags). Each one replaces the
/// matching environment variable before anything is parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub token_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base address; endpoint paths are appended verbatim.
    pub api_base_url: String,
    /// Directory holding the persisted token slot.
    pub token_dir: PathBuf,
    pub timeouts: HttpTimeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `GREENFRIENDS_API_BASE_URL`: default `http://localhost:8080/api`
    /// - `GREENFRIENDS_TOKEN_DIR`: default `<local data dir>/greenfriends`
    /// - `GREENFRIENDS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `GREENFRIENDS_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if the base URL is not an HTTP(S) URL.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`ClientConfig::from_env`] with `overrides` taking precedence. An
    /// overridden variable is never read or validated.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if the effective base URL is not an HTTP(S) URL.
    pub fn from_env_with(overrides: &ConfigOverrides) -> Result<Self, ClientError> {
        Self::from_lookup_with(overrides, |key| std::env::var(key).ok())
    }

    /// [`ClientConfig::from_lookup`] with `overrides` taking precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if the effective base URL is not an HTTP(S) URL.
    pub fn from_lookup_with<F>(overrides: &ConfigOverrides, lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            let explicit = match key {
                BASE_URL_VAR => overrides.base_url.clone(),
                TOKEN_DIR_VAR => overrides.token_dir.clone(),
                _ => None,
            };
            explicit.or_else(|| lookup(key))
        })
    }

    /// Same parsing as [`ClientConfig::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if the base URL is not an HTTP(S) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = normalize_base_url(
            lookup(BASE_URL_VAR)
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
        )?;
        let token_dir = lookup(TOKEN_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(default_token_dir, PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(lookup("GREENFRIENDS_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("GREENFRIENDS_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_base_url, token_dir, timeouts })
    }

    /// Replace the base URL, applying the same validation as env parsing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigParse`] if `url` is not an HTTP(S) URL.
    pub fn with_base_url(mut self, url: &str) -> Result<Self, ClientError> {
        self.api_base_url = normalize_base_url(url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = dir.into();
        self
    }
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::ConfigParse(format!(
            "GREENFRIENDS_API_BASE_URL must be an http(s) URL, got '{raw}'"
        )));
    }
    Ok(trimmed.to_owned())
}

fn default_token_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(|| PathBuf::from(".greenfriends"), |dir| dir.join(TOKEN_DIR_NAME))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
