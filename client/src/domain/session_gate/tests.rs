//! Tests for the session gate.

use std::sync::Mutex;

use async_trait::async_trait;
use rstest::rstest;
use tokio::sync::{Notify, broadcast};

use super::*;
use crate::domain::ports::{AuthProviderError, AuthSubscription, MockAuthProvider};
use crate::domain::{AccessToken, ErrorCode};

fn session() -> Session {
    Session::new(
        UserId::random(),
        Some("listener@example.com".to_owned()),
        AccessToken::new("access-token"),
    )
}

fn quiet_subscription() -> AuthSubscription {
    let (_sender, receiver) = broadcast::channel(4);
    AuthSubscription::new(receiver)
}

/// Provider whose initial lookup blocks until released.
struct HeldLookup {
    events: broadcast::Sender<AuthEvent>,
    release: Notify,
    result: Mutex<Option<Result<Option<Session>, AuthProviderError>>>,
}

impl HeldLookup {
    fn new(result: Result<Option<Session>, AuthProviderError>) -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            events,
            release: Notify::new(),
            result: Mutex::new(Some(result)),
        }
    }
}

#[async_trait]
impl AuthProvider for HeldLookup {
    async fn current_session(&self) -> Result<Option<Session>, AuthProviderError> {
        self.release.notified().await;
        self.result
            .lock()
            .expect("result lock")
            .take()
            .expect("lookup called once")
    }

    fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.events.subscribe())
    }

    async fn sign_in_with_password(
        &self,
        _credentials: &LoginCredentials,
    ) -> Result<Session, AuthProviderError> {
        Err(AuthProviderError::rejected("not used"))
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        Ok(())
    }
}

#[rstest]
#[tokio::test]
async fn start_publishes_existing_session() {
    let expected = session();
    let returned = expected.clone();
    let mut auth = MockAuthProvider::new();
    auth.expect_subscribe().times(1).returning(quiet_subscription);
    auth.expect_current_session()
        .times(1)
        .returning(move || Ok(Some(returned.clone())));

    let mut gate = SessionGate::new(Arc::new(auth));
    let context = gate.context();
    let state = gate.start().await.expect("start succeeds");

    assert_eq!(state, GateState::Authenticated(expected.clone()));
    assert_eq!(context.viewer(), Some(*expected.user_id()));
}

#[rstest]
#[tokio::test]
async fn start_without_session_settles_anonymous() {
    let mut auth = MockAuthProvider::new();
    auth.expect_subscribe().returning(quiet_subscription);
    auth.expect_current_session().returning(|| Ok(None));

    let mut gate = SessionGate::new(Arc::new(auth));
    assert_eq!(gate.state(), GateState::Loading);

    let state = gate.start().await.expect("start succeeds");
    assert_eq!(state, GateState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn failed_lookup_settles_anonymous_and_reports() {
    let mut auth = MockAuthProvider::new();
    auth.expect_subscribe().returning(quiet_subscription);
    auth.expect_current_session()
        .returning(|| Err(AuthProviderError::transport("connection refused")));

    let mut gate = SessionGate::new(Arc::new(auth));
    let context = gate.context();
    let error = gate.start().await.expect_err("lookup fails");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(context.state(), GateState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn state_is_loading_until_lookup_settles() {
    let auth = Arc::new(HeldLookup::new(Ok(None)));
    let mut gate = SessionGate::new(Arc::clone(&auth));
    let mut context = gate.context();

    let observer = async {
        tokio::task::yield_now().await;
        assert_eq!(context.state(), GateState::Loading);
        auth.release.notify_one();
        context.settled().await
    };
    let (started, observed) = tokio::join!(gate.start(), observer);

    assert_eq!(started.expect("start succeeds"), GateState::Anonymous);
    assert_eq!(observed, Some(GateState::Anonymous));
}

#[rstest]
#[tokio::test]
async fn event_during_lookup_wins_over_stale_result() {
    let auth = Arc::new(HeldLookup::new(Ok(Some(session()))));
    let mut gate = SessionGate::new(Arc::clone(&auth));
    let mut context = gate.context();

    let observer = async {
        tokio::task::yield_now().await;
        auth.events.send(AuthEvent::SignedOut).expect("listener subscribed");
        let changed = context.changed().await;
        auth.release.notify_one();
        changed
    };
    let (started, changed) = tokio::join!(gate.start(), observer);

    assert_eq!(changed, Some(GateState::Anonymous));
    assert_eq!(started.expect("start succeeds"), GateState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn sign_in_event_reaches_every_context() {
    let (events, _) = broadcast::channel(8);
    let sender = events.clone();
    let mut auth = MockAuthProvider::new();
    auth.expect_subscribe()
        .returning(move || AuthSubscription::new(events.subscribe()));
    auth.expect_current_session().returning(|| Ok(None));

    let mut gate = SessionGate::new(Arc::new(auth));
    let mut first = gate.context();
    let second = gate.context();
    gate.start().await.expect("start succeeds");
    first.settled().await;

    let signed_in = session();
    sender
        .send(AuthEvent::SignedIn(signed_in.clone()))
        .expect("listener subscribed");
    let observed = first.changed().await;

    assert_eq!(observed, Some(GateState::Authenticated(signed_in.clone())));
    assert_eq!(second.viewer(), Some(*signed_in.user_id()));
}

#[rstest]
#[tokio::test]
async fn declined_sign_out_does_not_contact_provider() {
    let auth = MockAuthProvider::new();
    let gate = SessionGate::new(Arc::new(auth));

    let signed_out = gate
        .sign_out(Confirmation::Declined)
        .await
        .expect("declining never fails");

    assert!(!signed_out);
    assert_eq!(gate.state(), GateState::Loading);
}

#[rstest]
#[tokio::test]
async fn confirmed_sign_out_publishes_anonymous() {
    let mut auth = MockAuthProvider::new();
    auth.expect_sign_out().times(1).returning(|| Ok(()));
    let gate = SessionGate::new(Arc::new(auth));

    let signed_out = gate
        .sign_out(Confirmation::Confirmed)
        .await
        .expect("sign out succeeds");

    assert!(signed_out);
    assert_eq!(gate.state(), GateState::Anonymous);
}

#[rstest]
#[tokio::test]
async fn sign_in_maps_bad_credentials() {
    let mut auth = MockAuthProvider::new();
    auth.expect_sign_in_with_password()
        .returning(|_| Err(AuthProviderError::invalid_credentials("bad password")));
    let gate = SessionGate::new(Arc::new(auth));
    let credentials =
        LoginCredentials::try_from_parts("listener@example.com", "hunter22").expect("valid");

    let error = gate.sign_in(&credentials).await.expect_err("rejected");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(gate.state(), GateState::Loading);
}
