//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `TRACKSHARE_*` environment variables or a config file.
//! A missing backend URL or anon key is not fatal: the client starts
//! unconfigured and every backend request fails with a clear error.

use std::env;
use std::fmt;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;
use url::Url;
use zeroize::Zeroizing;

const SESSION_DIR: &str = ".trackshare";
const SESSION_FILE_NAME: &str = "session.json";

fn default_session_file() -> PathBuf {
    env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(SESSION_DIR)
        .join(SESSION_FILE_NAME)
}

/// Errors raised when configured values are present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The backend URL did not parse.
    #[error("invalid backend url `{value}`: {message}")]
    InvalidBackendUrl {
        /// Configured value.
        value: String,
        /// Parser message.
        message: String,
    },
    /// The backend URL cannot carry path segments.
    #[error("backend url `{0}` cannot be used as a base url")]
    NotABase(String),
}

/// Configuration values for reaching the hosted backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRACKSHARE")]
pub struct ClientSettings {
    /// Base URL of the backend, for example `https://project.example.co`.
    pub backend_url: Option<String>,
    /// Public anonymous API key sent with every request.
    pub anon_key: Option<String>,
    /// Where the signed-in session is persisted between runs.
    pub session_file: Option<PathBuf>,
}

/// Validated backend coordinates.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    base_url: Url,
    anon_key: Zeroizing<String>,
}

impl BackendEndpoint {
    /// Validate a base URL and pair it with the anon key.
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, SettingsError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|error| SettingsError::InvalidBackendUrl {
            value: base_url.to_owned(),
            message: error.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(SettingsError::NotABase(base_url.to_owned()));
        }
        Ok(Self {
            base_url: parsed,
            anon_key: Zeroizing::new(anon_key.into()),
        })
    }

    /// Backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Anonymous API key.
    pub fn anon_key(&self) -> &str {
        self.anon_key.as_str()
    }
}

impl fmt::Debug for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendEndpoint")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl ClientSettings {
    /// Backend coordinates, or `None` when either value is missing.
    ///
    /// Missing values are logged as a warning rather than treated as an
    /// error.
    pub fn endpoint(&self) -> Result<Option<BackendEndpoint>, SettingsError> {
        let url = self.backend_url.as_deref().filter(|value| !value.trim().is_empty());
        let key = self.anon_key.as_deref().filter(|value| !value.trim().is_empty());
        match (url, key) {
            (Some(url), Some(key)) => BackendEndpoint::new(url, key).map(Some),
            (url, key) => {
                warn!(
                    backend_url_set = url.is_some(),
                    anon_key_set = key.is_some(),
                    "backend configuration missing; requests will fail until TRACKSHARE_BACKEND_URL and TRACKSHARE_ANON_KEY are set"
                );
                Ok(None)
            }
        }
    }

    /// Session file path, falling back to `$HOME/.trackshare/session.json`.
    pub fn session_file(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(default_session_file)
    }
}
