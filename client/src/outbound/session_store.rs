//! On-disk persistence for the signed-in session.
//!
//! The session is written as JSON so a later invocation of the CLI starts
//! authenticated. A missing file means no session; an unreadable one is
//! logged and treated the same way.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::AuthProviderError;
use crate::domain::{AccessToken, Session};

#[derive(Serialize, Deserialize)]
struct StoredSessionDto {
    user_id: Uuid,
    email: Option<String>,
    access_token: Zeroizing<String>,
    refresh_token: Option<Zeroizing<String>>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for StoredSessionDto {
    fn from(session: &Session) -> Self {
        Self {
            user_id: *session.user_id().as_uuid(),
            email: session.email().map(str::to_owned),
            access_token: Zeroizing::new(session.access_token().expose().to_owned()),
            refresh_token: session
                .refresh_token()
                .map(|token| Zeroizing::new(token.expose().to_owned())),
            expires_at: session.expires_at(),
        }
    }
}

impl StoredSessionDto {
    fn into_session(self) -> Session {
        let mut session = Session::new(
            self.user_id.into(),
            self.email,
            AccessToken::new(self.access_token.as_str()),
        );
        if let Some(refresh) = self.refresh_token {
            session = session.with_refresh_token(AccessToken::new(refresh.as_str()));
        }
        if let Some(expiry) = self.expires_at {
            session = session.with_expiry(expiry);
        }
        session
    }
}

/// JSON file holding at most one session.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store backed by `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError::SessionStore`] when the file exists but
    /// cannot be read.
    pub async fn load(&self) -> Result<Option<Session>, AuthProviderError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => Zeroizing::new(raw),
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(self.store_error("read", &error)),
        };
        match serde_json::from_slice::<StoredSessionDto>(&raw) {
            Ok(stored) => Ok(Some(stored.into_session())),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    /// Persist `session`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError::SessionStore`] when the directory or file
    /// cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), AuthProviderError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|error| self.store_error("create directory for", &error))?;
        }
        let payload = Zeroizing::new(
            serde_json::to_vec(&StoredSessionDto::from(session))
                .map_err(|error| AuthProviderError::session_store(error.to_string()))?,
        );

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|error| self.store_error("open", &error))?;
        file.write_all(&payload)
            .await
            .map_err(|error| self.store_error("write", &error))?;
        file.flush()
            .await
            .map_err(|error| self.store_error("flush", &error))
    }

    /// Remove the persisted session. Clearing an absent file succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProviderError::SessionStore`] when the file exists but
    /// cannot be removed.
    pub async fn clear(&self) -> Result<(), AuthProviderError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.store_error("remove", &error)),
        }
    }

    fn store_error(&self, action: &str, error: &io::Error) -> AuthProviderError {
        AuthProviderError::session_store(format!(
            "failed to {action} {}: {error}",
            self.path.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    //! Round-trip and failure coverage for the session file.

    use super::*;
    use crate::domain::UserId;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn session() -> Session {
        Session::new(
            UserId::random(),
            Some("ada@example.com".to_owned()),
            AccessToken::new("access"),
        )
        .with_refresh_token(AccessToken::new("refresh"))
        .with_expiry(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn missing_file_means_no_session(dir: TempDir) {
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().await, Ok(None));
    }

    #[rstest]
    #[tokio::test]
    async fn saved_session_is_loaded_back(dir: TempDir) {
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        let session = session();

        store.save(&session).await.expect("save succeeds");

        assert_eq!(store.load().await, Ok(Some(session)));
    }

    #[rstest]
    #[tokio::test]
    async fn clear_is_idempotent(dir: TempDir) {
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&session()).await.expect("save succeeds");

        store.clear().await.expect("first clear");
        store.clear().await.expect("second clear");

        assert_eq!(store.load().await, Ok(None));
    }

    #[rstest]
    #[tokio::test]
    async fn corrupt_file_is_ignored(dir: TempDir) {
        let path = dir.path().join("session.json");
        fs::write(&path, b"{not json").await.expect("write fixture");

        assert_eq!(FileSessionStore::new(path).load().await, Ok(None));
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn session_file_is_private(dir: TempDir) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("session.json");
        FileSessionStore::new(&path)
            .save(&session())
            .await
            .expect("save succeeds");

        let mode = fs::metadata(&path).await.expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
