//! Follow/unfollow control.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::error_mapping::map_data_store_error;
use super::ports::FollowRepository;
use super::{Error, FollowEdge, FollowState, UserId};

/// Conflict message returned while a toggle for the same pair is running.
pub const FOLLOW_IN_PROGRESS: &str = "follow request already in progress";

/// Flips follow edges, at most one request per (follower, followed) pair.
pub struct FollowToggle<F: ?Sized> {
    follows: Arc<F>,
    in_flight: Mutex<HashSet<FollowEdge>>,
}

/// Releases a pair's in-flight slot when the toggle finishes.
struct InFlight<'a> {
    pairs: &'a Mutex<HashSet<FollowEdge>>,
    edge: FollowEdge,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pairs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.edge);
    }
}

impl<F> FollowToggle<F>
where
    F: FollowRepository + ?Sized,
{
    /// Create a toggle over the follow repository.
    pub fn new(follows: Arc<F>) -> Self {
        Self {
            follows,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, edge: FollowEdge) -> Result<InFlight<'_>, Error> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(edge);
        if inserted {
            Ok(InFlight {
                pairs: &self.in_flight,
                edge,
            })
        } else {
            Err(Error::conflict(FOLLOW_IN_PROGRESS))
        }
    }

    /// Flip the viewer's follow of `target`, starting from `current`.
    ///
    /// Following: delete the edge and decrement (floor 0). Not following:
    /// insert the edge, accepting an existing one, and increment. On any
    /// other failure `current` is left as it was and the error returned.
    pub async fn toggle(
        &self,
        viewer: UserId,
        target: UserId,
        current: FollowState,
    ) -> Result<FollowState, Error> {
        let edge = FollowEdge::new(viewer, target);
        if edge.is_self_loop() {
            return Err(Error::invalid_request("You cannot follow yourself."));
        }
        let _slot = self.claim(edge)?;

        if current.following {
            self.follows
                .delete(&edge)
                .await
                .map_err(|error| map_data_store_error("Error unfollowing user", error))?;
            return Ok(current.unfollowed());
        }

        match self.follows.insert(&edge).await {
            Ok(()) => {}
            Err(error) if error.is_already_exists() => {
                debug!(follower = %viewer, followed = %target, "follow edge already present");
            }
            Err(error) => return Err(map_data_store_error("Error following user", error)),
        }
        Ok(current.followed())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{DataStoreError, MockFollowRepository};
    use rstest::rstest;

    fn state(following: bool, follower_count: u64) -> FollowState {
        FollowState {
            following,
            follower_count,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn follow_increments() {
        let mut follows = MockFollowRepository::new();
        follows.expect_insert().times(1).returning(|_| Ok(()));
        let toggle = FollowToggle::new(Arc::new(follows));

        let next = toggle
            .toggle(UserId::random(), UserId::random(), state(false, 2))
            .await
            .expect("follow succeeds");

        assert_eq!(next, state(true, 3));
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_insert_counts_as_followed() {
        let mut follows = MockFollowRepository::new();
        follows
            .expect_insert()
            .returning(|_| Err(DataStoreError::already_exists("followers_pkey")));
        let toggle = FollowToggle::new(Arc::new(follows));

        let next = toggle
            .toggle(UserId::random(), UserId::random(), state(false, 0))
            .await
            .expect("duplicate is benign");

        assert_eq!(next, state(true, 1));
    }

    #[rstest]
    #[tokio::test]
    async fn unfollow_floors_at_zero() {
        let mut follows = MockFollowRepository::new();
        follows.expect_delete().times(1).returning(|_| Ok(()));
        let toggle = FollowToggle::new(Arc::new(follows));

        let next = toggle
            .toggle(UserId::random(), UserId::random(), state(true, 0))
            .await
            .expect("unfollow succeeds");

        assert_eq!(next, state(false, 0));
    }

    #[rstest]
    #[tokio::test]
    async fn racing_insert_then_toggle_ends_not_following() {
        let mut follows = MockFollowRepository::new();
        follows
            .expect_insert()
            .returning(|_| Err(DataStoreError::already_exists("duplicate key")));
        follows.expect_delete().times(1).returning(|_| Ok(()));
        let toggle = FollowToggle::new(Arc::new(follows));
        let (viewer, target) = (UserId::random(), UserId::random());

        let followed = toggle
            .toggle(viewer, target, state(false, 5))
            .await
            .expect("follow succeeds");
        let unfollowed = toggle
            .toggle(viewer, target, followed)
            .await
            .expect("unfollow succeeds");

        assert_eq!(unfollowed, state(false, 5));
    }

    #[rstest]
    #[tokio::test]
    async fn other_failure_leaves_state_unchanged() {
        let mut follows = MockFollowRepository::new();
        follows
            .expect_insert()
            .returning(|_| Err(DataStoreError::connection("timed out")));
        let toggle = FollowToggle::new(Arc::new(follows));

        let error = toggle
            .toggle(UserId::random(), UserId::random(), state(false, 1))
            .await
            .expect_err("insert fails");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn self_follow_is_rejected_without_call() {
        let toggle = FollowToggle::new(Arc::new(MockFollowRepository::new()));
        let me = UserId::random();

        let error = toggle
            .toggle(me, me, state(false, 0))
            .await
            .expect_err("self follow");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn second_claim_for_same_pair_conflicts() {
        let toggle = FollowToggle::new(Arc::new(MockFollowRepository::new()));
        let edge = FollowEdge::new(UserId::random(), UserId::random());

        let first = toggle.claim(edge).expect("first claim");
        let error = toggle.claim(edge).err().expect("second claim rejected");
        assert_eq!(error.code(), ErrorCode::Conflict);
        assert_eq!(error.message(), FOLLOW_IN_PROGRESS);

        drop(first);
        assert!(toggle.claim(edge).is_ok());
    }
}
