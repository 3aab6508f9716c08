//! Reqwest-backed auth provider adapter.
//!
//! The adapter keeps the current session in a watch channel shared with
//! [`BackendClient`], so every data and storage request carries the newest
//! access token. Sessions are persisted through [`FileSessionStore`] and
//! refreshed once expired.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::dto::{AuthErrorDto, PasswordGrantDto, RefreshGrantDto, TokenResponseDto};
use super::{BackendClient, RawResponse, execute, status_message};
use crate::domain::ports::{AuthProvider, AuthProviderError, AuthSubscription};
use crate::domain::{AuthEvent, LoginCredentials, Session};
use crate::outbound::session_store::FileSessionStore;

const EVENT_CAPACITY: usize = 16;

/// Auth provider over the backend's token API.
pub struct HttpAuthProvider {
    client: BackendClient,
    session: watch::Sender<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    store: FileSessionStore,
    clock: Arc<dyn Clock>,
}

impl HttpAuthProvider {
    /// Build the provider. `session` must be the sender paired with the
    /// receiver passed to [`BackendClient::new`].
    pub fn new(
        client: BackendClient,
        session: watch::Sender<Option<Session>>,
        store: FileSessionStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            session,
            events,
            store,
            clock,
        }
    }

    fn ensure_configured(&self) -> Result<(), AuthProviderError> {
        if self.client.is_configured() {
            Ok(())
        } else {
            Err(AuthProviderError::unconfigured(
                "set TRACKSHARE_BACKEND_URL and TRACKSHARE_ANON_KEY",
            ))
        }
    }

    async fn token_grant<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<Session, AuthProviderError> {
        let mut url = self
            .client
            .url(["auth", "v1", "token"])
            .map_err(AuthProviderError::unconfigured)?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let builder = self
            .client
            .anon_request(Method::POST, url)
            .map_err(AuthProviderError::unconfigured)?
            .json(body);
        let response = execute(builder).await.map_err(map_transport_error)?;
        let token: TokenResponseDto = decode_success(&response)?;
        Ok(token.into_session(self.clock.utc()))
    }

    async fn adopt(&self, session: Session, event: AuthEvent) -> Result<Session, AuthProviderError> {
        self.store.save(&session).await?;
        self.session.send_replace(Some(session.clone()));
        // No subscribers is not an error.
        let _delivered = self.events.send(event);
        Ok(session)
    }

    async fn forget(&self) -> Result<(), AuthProviderError> {
        self.session.send_replace(None);
        self.store.clear().await
    }

    async fn refresh(&self, stale: &Session) -> Result<Option<Session>, AuthProviderError> {
        let Some(refresh_token) = stale.refresh_token() else {
            info!(user = %stale.user_id(), "stored session expired without refresh token");
            self.forget().await?;
            return Ok(None);
        };
        let body = RefreshGrantDto {
            refresh_token: refresh_token.expose(),
        };
        match self.token_grant("refresh_token", &body).await {
            Ok(session) => {
                let event = AuthEvent::TokenRefreshed(session.clone());
                self.adopt(session, event).await.map(Some)
            }
            Err(
                AuthProviderError::Rejected { message }
                | AuthProviderError::InvalidCredentials { message },
            ) => {
                warn!(%message, "session refresh rejected; signing out locally");
                self.forget().await?;
                let _delivered = self.events.send(AuthEvent::SignedOut);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthProviderError> {
        self.ensure_configured()?;
        let cached = self.session.borrow().clone();
        let session = match cached {
            Some(session) => session,
            None => match self.store.load().await? {
                Some(session) => session,
                None => return Ok(None),
            },
        };
        if session.is_expired_at(self.clock.utc()) {
            return self.refresh(&session).await;
        }
        self.session.send_replace(Some(session.clone()));
        Ok(Some(session))
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Session, AuthProviderError> {
        self.ensure_configured()?;
        let body = PasswordGrantDto {
            email: credentials.email(),
            password: credentials.password(),
        };
        let session = self.token_grant("password", &body).await?;
        info!(user = %session.user_id(), "signed in");
        let event = AuthEvent::SignedIn(session.clone());
        self.adopt(session, event).await
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        self.ensure_configured()?;
        let url = self
            .client
            .url(["auth", "v1", "logout"])
            .map_err(AuthProviderError::unconfigured)?;
        let builder = self
            .client
            .request(Method::POST, url)
            .map_err(AuthProviderError::unconfigured)?;
        match execute(builder).await {
            Ok(response) if response.status.is_success() => {}
            Ok(response) => warn!(
                status = response.status.as_u16(),
                "remote sign-out refused; clearing local session anyway"
            ),
            Err(error) => warn!(%error, "remote sign-out failed; clearing local session anyway"),
        }
        self.forget().await?;
        let _delivered = self.events.send(AuthEvent::SignedOut);
        info!("signed out");
        Ok(())
    }
}

fn map_transport_error(error: reqwest::Error) -> AuthProviderError {
    AuthProviderError::transport(error.to_string())
}

fn decode_success(response: &RawResponse) -> Result<TokenResponseDto, AuthProviderError> {
    if !response.status.is_success() {
        return Err(map_status_error(response.status, &response.body));
    }
    serde_json::from_slice(&response.body)
        .map_err(|error| AuthProviderError::rejected(format!("unreadable token response: {error}")))
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AuthProviderError {
    let detail = serde_json::from_slice::<AuthErrorDto>(body).unwrap_or_default();
    let message = detail
        .detail()
        .map_or_else(|| status_message(status, body), str::to_owned);
    if detail.is_invalid_credentials() {
        return AuthProviderError::invalid_credentials(message);
    }
    if status.is_server_error() {
        return AuthProviderError::transport(message);
    }
    AuthProviderError::rejected(message)
}
