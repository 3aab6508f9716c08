//! In-memory auth provider.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::ports::{AuthProvider, AuthProviderError, AuthSubscription};
use crate::domain::{AccessToken, AuthEvent, LoginCredentials, Session, UserId};

#[derive(Default)]
struct AuthState {
    accounts: HashMap<String, (String, UserId)>,
    current: Option<Session>,
    lookup_failure: Option<AuthProviderError>,
    sign_out_calls: usize,
}

/// Auth provider holding accounts and the current session in memory.
pub struct InMemoryAuth {
    state: Mutex<AuthState>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for InMemoryAuth {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(AuthState::default()),
            events,
        }
    }
}

impl InMemoryAuth {
    /// Provider with no accounts and no session.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account and return its id.
    pub fn add_account(&self, email: &str, password: &str) -> UserId {
        let id = UserId::random();
        self.lock()
            .accounts
            .insert(email.to_lowercase(), (password.to_owned(), id));
        id
    }

    /// Start with `user` already signed in, as if restored from disk.
    pub fn restore_session(&self, user: UserId) -> Session {
        let session = session_for(user, None);
        self.lock().current = Some(session.clone());
        session
    }

    /// Make every `current_session` call fail with `error`.
    pub fn fail_lookup(&self, error: AuthProviderError) {
        self.lock().lookup_failure = Some(error);
    }

    /// Push an event to subscribers, updating the current session.
    pub fn emit(&self, event: AuthEvent) {
        self.lock().current = event.session().cloned();
        let _delivered = self.events.send(event);
    }

    /// Number of sign-out requests received.
    pub fn sign_out_calls(&self) -> usize {
        self.lock().sign_out_calls
    }
}

fn session_for(user: UserId, email: Option<String>) -> Session {
    Session::new(user, email, AccessToken::new(format!("memory-token-{user}")))
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthProviderError> {
        let state = self.lock();
        match &state.lookup_failure {
            Some(error) => Err(error.clone()),
            None => Ok(state.current.clone()),
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn sign_in_with_password(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Session, AuthProviderError> {
        let session = {
            let mut state = self.lock();
            let user = match state.accounts.get(credentials.email()) {
                Some((password, user)) if password == credentials.password() => *user,
                _ => {
                    return Err(AuthProviderError::invalid_credentials(
                        "Invalid login credentials",
                    ));
                }
            };
            let session = session_for(user, Some(credentials.email().to_owned()));
            state.current = Some(session.clone());
            session
        };
        let _delivered = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        {
            let mut state = self.lock();
            state.sign_out_calls += 1;
            state.current = None;
        }
        let _delivered = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }
}
