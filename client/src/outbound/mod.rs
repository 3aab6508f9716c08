//! Outbound adapters implementing the domain ports.
//!
//! `backend` talks to the hosted REST, storage and auth APIs over reqwest;
//! `session_store` keeps the signed-in session on disk between runs.

pub mod backend;
pub mod session_store;

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::watch;

use self::backend::{BackendClient, HttpAuthProvider, HttpObjectStorage, RestDataStore};
use self::session_store::FileSessionStore;
use crate::config::{ClientSettings, SettingsError};

/// Errors raised while wiring adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Configured values were present but unusable.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Every adapter the client needs, sharing one HTTP client and session.
pub struct BackendAdapters {
    /// Auth provider.
    pub auth: Arc<HttpAuthProvider>,
    /// Table adapter implementing the repository ports.
    pub data: Arc<RestDataStore>,
    /// Object storage adapter.
    pub storage: Arc<HttpObjectStorage>,
}

impl BackendAdapters {
    /// Build adapters from settings. A missing backend URL or anon key
    /// yields adapters that fail every request with a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when configured values are malformed or the
    /// HTTP client cannot be built.
    pub fn connect(settings: &ClientSettings, clock: Arc<dyn Clock>) -> Result<Self, AdapterError> {
        let endpoint = settings.endpoint()?;
        let (session_tx, session_rx) = watch::channel(None);
        let client = BackendClient::new(endpoint, session_rx)?;
        let store = FileSessionStore::new(settings.session_file());
        Ok(Self {
            auth: Arc::new(HttpAuthProvider::new(
                client.clone(),
                session_tx,
                store,
                clock,
            )),
            data: Arc::new(RestDataStore::new(client.clone())),
            storage: Arc::new(HttpObjectStorage::new(client)),
        })
    }
}
