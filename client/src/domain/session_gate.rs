//! Session gate: the single owner of the client's session state.
//!
//! The gate fetches the current session once, listens for auth events, and
//! publishes the resulting [`GateState`] on a watch channel. Views never
//! talk to the auth provider themselves; they receive a [`SessionContext`]
//! handle and read or await the shared state through it.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error_mapping::map_auth_error;
use super::ports::AuthProvider;
use super::{AuthEvent, Confirmation, Error, LoginCredentials, Session, UserId};

/// What the application shell should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// The initial session lookup has not settled yet.
    Loading,
    /// A user is signed in.
    Authenticated(Session),
    /// No user is signed in.
    Anonymous,
}

impl GateState {
    /// Session, when authenticated.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Loading | Self::Anonymous => None,
        }
    }

    /// Signed-in user id, when authenticated.
    pub fn viewer(&self) -> Option<UserId> {
        self.session().map(|session| *session.user_id())
    }

    /// Whether the initial lookup is still pending.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    fn from_event(event: &AuthEvent) -> Self {
        event
            .session()
            .map_or(Self::Anonymous, |session| Self::Authenticated(session.clone()))
    }
}

/// Read handle on the gate's state, passed explicitly to each view.
#[derive(Debug, Clone)]
pub struct SessionContext {
    receiver: watch::Receiver<GateState>,
}

impl SessionContext {
    /// Snapshot of the current state.
    pub fn state(&self) -> GateState {
        self.receiver.borrow().clone()
    }

    /// Signed-in user id, when authenticated.
    pub fn viewer(&self) -> Option<UserId> {
        self.receiver.borrow().viewer()
    }

    /// Wait for the next state change.
    ///
    /// Returns `None` once the gate has been dropped.
    pub async fn changed(&mut self) -> Option<GateState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the initial lookup has settled.
    ///
    /// Returns `None` if the gate is dropped while still loading.
    pub async fn settled(&mut self) -> Option<GateState> {
        self.receiver
            .wait_for(|state| !state.is_loading())
            .await
            .ok()
            .map(|state| state.clone())
    }
}

/// Owner of the session state and of the auth event subscription.
pub struct SessionGate<A: ?Sized> {
    auth: Arc<A>,
    state: Arc<watch::Sender<GateState>>,
    listener: Option<JoinHandle<()>>,
}

impl<A: ?Sized> SessionGate<A> {
    /// Create a gate in the [`GateState::Loading`] state.
    pub fn new(auth: Arc<A>) -> Self {
        let (state, _) = watch::channel(GateState::Loading);
        Self {
            auth,
            state: Arc::new(state),
            listener: None,
        }
    }

    /// Hand out a read handle for a view.
    pub fn context(&self) -> SessionContext {
        SessionContext {
            receiver: self.state.subscribe(),
        }
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    /// Release the auth event subscription.
    ///
    /// The published state is left as is; contexts keep reading it.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            debug!("session gate listener released");
        }
    }
}

impl<A> SessionGate<A>
where
    A: AuthProvider + ?Sized,
{
    /// Subscribe to auth events and resolve the initial session.
    ///
    /// The state stays [`GateState::Loading`] until the lookup settles. An
    /// event that arrives first wins: the lookup result is then discarded
    /// because it can only be as new as the event. A failed lookup settles
    /// the gate as [`GateState::Anonymous`] and is returned to the caller.
    pub async fn start(&mut self) -> Result<GateState, Error> {
        if self.listener.is_none() {
            let mut subscription = self.auth.subscribe();
            let state = Arc::clone(&self.state);
            self.listener = Some(tokio::spawn(async move {
                while let Some(event) = subscription.next().await {
                    debug!(?event, "auth event received");
                    state.send_replace(GateState::from_event(&event));
                }
            }));
        }

        let (settled, outcome) = match self.auth.current_session().await {
            Ok(Some(session)) => (GateState::Authenticated(session), Ok(())),
            Ok(None) => (GateState::Anonymous, Ok(())),
            Err(error) => {
                warn!(%error, "initial session lookup failed");
                (GateState::Anonymous, Err(map_auth_error(error)))
            }
        };
        self.state.send_if_modified(|current| {
            if current.is_loading() {
                *current = settled;
                true
            } else {
                false
            }
        });
        outcome.map(|()| self.state())
    }

    /// Sign in and publish the new session.
    pub async fn sign_in(&self, credentials: &LoginCredentials) -> Result<Session, Error> {
        let session = self
            .auth
            .sign_in_with_password(credentials)
            .await
            .map_err(map_auth_error)?;
        self.state
            .send_replace(GateState::Authenticated(session.clone()));
        Ok(session)
    }

    /// Sign out after an explicit confirmation.
    ///
    /// Returns `false` without contacting the provider when declined.
    pub async fn sign_out(&self, confirmation: Confirmation) -> Result<bool, Error> {
        if !confirmation.is_confirmed() {
            return Ok(false);
        }
        self.auth.sign_out().await.map_err(map_auth_error)?;
        self.state.send_replace(GateState::Anonymous);
        Ok(true)
    }
}

impl<A: ?Sized> Drop for SessionGate<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests;
