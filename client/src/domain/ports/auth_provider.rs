//! Driven port for the hosted auth provider.
//!
//! The provider owns the token lifecycle. The client only asks for the
//! current session, listens for change notifications, and forwards sign-in
//! and sign-out requests.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{AuthEvent, LoginCredentials, Session};

use super::define_port_error;

define_port_error! {
    /// Errors raised by auth provider adapters.
    pub enum AuthProviderError {
        /// The provider could not be reached.
        Transport => "auth provider unreachable: {message}",
        /// Email/password were rejected.
        InvalidCredentials => "invalid credentials: {message}",
        /// The provider refused the request for another reason.
        Rejected => "auth request rejected: {message}",
        /// Stored session data could not be read or written.
        SessionStore => "session store failed: {message}",
        /// No backend endpoint is configured.
        Unconfigured => "auth provider not configured: {message}",
    }
}

/// Live feed of [`AuthEvent`]s.
///
/// Dropping the subscription releases it; the provider keeps no reference
/// to individual listeners.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Wrap a broadcast receiver.
    pub fn new(receiver: broadcast::Receiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the provider has shut down. Events missed because
    /// the listener fell behind are skipped; only the newest state matters to
    /// session consumers.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "auth subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Port for the auth provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// One-shot lookup of the current session, if any.
    async fn current_session(&self) -> Result<Option<Session>, AuthProviderError>;

    /// Register for session-change notifications.
    fn subscribe(&self) -> AuthSubscription;

    /// Exchange an email/password pair for a session.
    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Session, AuthProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), AuthProviderError>;
}
