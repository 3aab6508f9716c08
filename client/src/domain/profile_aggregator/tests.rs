//! Tests for the profile aggregator.

use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    DataStoreError, MockFollowRepository, MockProfileRepository, MockTrackRepository,
};

type Aggregator = ProfileAggregator<MockProfileRepository, MockTrackRepository, MockFollowRepository>;

fn aggregator(
    profiles: MockProfileRepository,
    tracks: MockTrackRepository,
    follows: MockFollowRepository,
) -> Aggregator {
    ProfileAggregator::new(Arc::new(profiles), Arc::new(tracks), Arc::new(follows))
}

fn named(id: UserId, username: &str) -> Profile {
    Profile {
        username: Some(username.to_owned()),
        ..Profile::empty(id)
    }
}

fn counting(follows: &mut MockFollowRepository, subject: UserId, followers: u64, following: u64) {
    follows
        .expect_count()
        .withf(move |id, kind| *id == subject && *kind == RelationKind::Followers)
        .times(1)
        .returning(move |_, _| Ok(followers));
    follows
        .expect_count()
        .withf(move |id, kind| *id == subject && *kind == RelationKind::Following)
        .times(1)
        .returning(move |_, _| Ok(following));
}

#[rstest]
#[tokio::test]
async fn own_profile_loads_every_track_without_follow_probe() {
    let viewer = UserId::random();
    let mut profiles = MockProfileRepository::new();
    profiles
        .expect_find_by_id()
        .returning(move |id| Ok(Some(named(*id, "dj_viewer"))));
    let mut tracks = MockTrackRepository::new();
    tracks
        .expect_list_by_owner()
        .withf(move |owner, scope| *owner == viewer && *scope == VisibilityScope::All)
        .times(1)
        .returning(|_, _| Ok(Vec::new()));
    let mut follows = MockFollowRepository::new();
    counting(&mut follows, viewer, 4, 2);
    follows.expect_exists().never();

    let view = aggregator(profiles, tracks, follows)
        .aggregate(None, Some(viewer))
        .await
        .expect("aggregate succeeds");

    assert!(view.is_own());
    assert_eq!(view.profile.display_username(), "dj_viewer");
    assert_eq!((view.follower_count, view.following_count), (4, 2));
    assert_eq!(view.follow_state(), None);
}

#[rstest]
#[tokio::test]
async fn explicit_own_id_is_own_profile() {
    let viewer = UserId::random();
    let mut profiles = MockProfileRepository::new();
    profiles.expect_find_by_id().returning(|_| Ok(None));
    let mut tracks = MockTrackRepository::new();
    tracks
        .expect_list_by_owner()
        .withf(|_, scope| *scope == VisibilityScope::All)
        .returning(|_, _| Ok(Vec::new()));
    let mut follows = MockFollowRepository::new();
    counting(&mut follows, viewer, 0, 0);
    follows.expect_exists().never();

    let view = aggregator(profiles, tracks, follows)
        .aggregate(Some(viewer), Some(viewer))
        .await
        .expect("aggregate succeeds");

    assert_eq!(view.relationship, Relationship::Own);
    assert_eq!(view.profile, Profile::empty(viewer));
}

#[rstest]
#[tokio::test]
async fn anonymous_viewer_never_probes_follow_status() {
    let target = UserId::random();
    let mut profiles = MockProfileRepository::new();
    profiles
        .expect_find_by_id()
        .returning(move |id| Ok(Some(named(*id, "someone"))));
    let mut tracks = MockTrackRepository::new();
    tracks
        .expect_list_by_owner()
        .withf(|_, scope| *scope == VisibilityScope::PublicOnly)
        .times(1)
        .returning(|_, _| Ok(Vec::new()));
    let mut follows = MockFollowRepository::new();
    counting(&mut follows, target, 1, 1);
    follows.expect_exists().never();

    let view = aggregator(profiles, tracks, follows)
        .aggregate(Some(target), None)
        .await
        .expect("aggregate succeeds");

    assert_eq!(
        view.relationship,
        Relationship::Other {
            viewer_follows: None
        }
    );
    assert_eq!(view.follow_state(), None);
}

#[rstest]
#[tokio::test]
async fn signed_in_viewer_sees_follow_status() {
    let viewer = UserId::random();
    let target = UserId::random();
    let mut profiles = MockProfileRepository::new();
    profiles.expect_find_by_id().returning(|_| Ok(None));
    let mut tracks = MockTrackRepository::new();
    tracks.expect_list_by_owner().returning(|_, _| Ok(Vec::new()));
    let mut follows = MockFollowRepository::new();
    counting(&mut follows, target, 3, 0);
    follows
        .expect_exists()
        .withf(move |edge| *edge == FollowEdge::new(viewer, target))
        .times(1)
        .returning(|_| Ok(true));

    let view = aggregator(profiles, tracks, follows)
        .aggregate(Some(target), Some(viewer))
        .await
        .expect("aggregate succeeds");

    assert_eq!(
        view.follow_state(),
        Some(FollowState {
            following: true,
            follower_count: 3
        })
    );
}

#[rstest]
#[tokio::test]
async fn own_profile_requires_a_viewer() {
    let error = aggregator(
        MockProfileRepository::new(),
        MockTrackRepository::new(),
        MockFollowRepository::new(),
    )
    .aggregate(None, None)
    .await
    .expect_err("no subject");

    assert_eq!(error.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn single_failure_aborts_aggregate() {
    let target = UserId::random();
    let mut profiles = MockProfileRepository::new();
    profiles.expect_find_by_id().returning(|_| Ok(None));
    let mut tracks = MockTrackRepository::new();
    tracks
        .expect_list_by_owner()
        .returning(|_, _| Err(DataStoreError::query("permission denied for table tracks")));
    let mut follows = MockFollowRepository::new();
    follows.expect_count().returning(|_, _| Ok(0));

    let error = aggregator(profiles, tracks, follows)
        .load(Some(target), None)
        .await
        .expect_err("aggregate fails");

    assert_eq!(error.code(), ErrorCode::DataStore);
    assert!(error.message().starts_with("Error fetching tracks"));
}
