//! Authenticated session snapshot and change notifications.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use super::UserId;

/// Opaque bearer credential issued by the auth provider.
///
/// The value is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Zeroizing::new(raw.into()))
    }

    /// Borrow the raw token for an `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Identity and credentials bound to the current client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
    email: Option<String>,
    access_token: AccessToken,
    refresh_token: Option<AccessToken>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from its parts.
    pub fn new(user_id: UserId, email: Option<String>, access_token: AccessToken) -> Self {
        Self {
            user_id,
            email,
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Attach the refresh token used to renew this session.
    #[must_use]
    pub fn with_refresh_token(mut self, token: AccessToken) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Attach the instant at which the access token stops being accepted.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Authenticated user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Email address registered with the auth provider, when known.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Bearer token for backend requests.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Refresh token, if the provider issued one.
    pub fn refresh_token(&self) -> Option<&AccessToken> {
        self.refresh_token.as_ref()
    }

    /// Expiry of the access token, if the provider reported one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the access token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Push notification emitted by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user signed in.
    SignedIn(Session),
    /// The current user signed out or the session was revoked.
    SignedOut,
    /// The access token was renewed for the same user.
    TokenRefreshed(Session),
}

impl AuthEvent {
    /// Session carried by the event, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) | Self::TokenRefreshed(session) => Some(session),
            Self::SignedOut => None,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    #[rstest]
    fn debug_output_redacts_tokens() {
        let session = Session::new(
            UserId::random(),
            Some("ada@example.com".to_owned()),
            AccessToken::new("secret-token"),
        );
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[rstest]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let session = Session::new(UserId::random(), None, AccessToken::new("t")).with_expiry(now);
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::seconds(1)));
    }

    #[rstest]
    fn signed_out_event_carries_no_session() {
        assert!(AuthEvent::SignedOut.session().is_none());
    }
}
