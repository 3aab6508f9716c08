//! Profile page aggregate: profile fields, follow counts, tracks and the
//! viewer's relationship to the profile owner.

use std::sync::Arc;

use tracing::debug;

use super::error_mapping::map_data_store_error;
use super::ports::{FollowRepository, ProfileRepository, TrackRepository};
use super::{
    Error, FollowEdge, FollowState, Profile, RelationKind, RequestGeneration, TrackListing,
    UserId, VisibilityScope,
};

/// How the viewer relates to the profile being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// The viewer is looking at their own profile.
    Own,
    /// Someone else's profile.
    Other {
        /// Whether the viewer follows the owner; `None` when signed out.
        viewer_follows: Option<bool>,
    },
}

/// Everything the profile page renders, fetched as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    /// Profile fields; empty when the owner never saved a profile.
    pub profile: Profile,
    /// Users following the owner.
    pub follower_count: u64,
    /// Users the owner follows.
    pub following_count: u64,
    /// Own profile: every track. Other profile: public tracks only.
    pub tracks: Vec<TrackListing>,
    /// Viewer's relationship to the owner.
    pub relationship: Relationship,
}

impl ProfileView {
    /// Whether this is the viewer's own profile.
    pub fn is_own(&self) -> bool {
        matches!(self.relationship, Relationship::Own)
    }

    /// Seed for a follow control, when one should be shown.
    pub fn follow_state(&self) -> Option<FollowState> {
        match self.relationship {
            Relationship::Other {
                viewer_follows: Some(following),
            } => Some(FollowState {
                following,
                follower_count: self.follower_count,
            }),
            Relationship::Own | Relationship::Other { viewer_follows: None } => None,
        }
    }
}

/// Loads [`ProfileView`]s.
pub struct ProfileAggregator<P: ?Sized, T: ?Sized, F: ?Sized> {
    profiles: Arc<P>,
    tracks: Arc<T>,
    follows: Arc<F>,
    generation: RequestGeneration,
}

impl<P, T, F> ProfileAggregator<P, T, F>
where
    P: ProfileRepository + ?Sized,
    T: TrackRepository + ?Sized,
    F: FollowRepository + ?Sized,
{
    /// Create an aggregator over the given repositories.
    pub fn new(profiles: Arc<P>, tracks: Arc<T>, follows: Arc<F>) -> Self {
        Self {
            profiles,
            tracks,
            follows,
            generation: RequestGeneration::new(),
        }
    }

    /// Fetch the aggregate for `target` as seen by `viewer`.
    ///
    /// `target` of `None` means the viewer's own profile. All queries run
    /// concurrently and the first failure aborts the whole aggregate.
    pub async fn aggregate(
        &self,
        target: Option<UserId>,
        viewer: Option<UserId>,
    ) -> Result<ProfileView, Error> {
        let Some(subject) = target.or(viewer) else {
            return Err(Error::unauthorized("Sign in to view your profile."));
        };
        let is_own = viewer == Some(subject);
        let scope = if is_own {
            VisibilityScope::All
        } else {
            VisibilityScope::PublicOnly
        };
        let follow_probe = viewer
            .filter(|_| !is_own)
            .map(|viewer| FollowEdge::new(viewer, subject));

        let profile = async {
            self.profiles
                .find_by_id(&subject)
                .await
                .map_err(|error| map_data_store_error("Error fetching profile", error))
        };
        let followers = async {
            self.follows
                .count(&subject, RelationKind::Followers)
                .await
                .map_err(|error| map_data_store_error("Error counting followers", error))
        };
        let following = async {
            self.follows
                .count(&subject, RelationKind::Following)
                .await
                .map_err(|error| map_data_store_error("Error counting following", error))
        };
        let tracks = async {
            self.tracks
                .list_by_owner(&subject, scope)
                .await
                .map_err(|error| map_data_store_error("Error fetching tracks", error))
        };
        let viewer_follows = async {
            match follow_probe {
                Some(edge) => self
                    .follows
                    .exists(&edge)
                    .await
                    .map(Some)
                    .map_err(|error| map_data_store_error("Error checking follow status", error)),
                None => Ok(None),
            }
        };

        let (profile, follower_count, following_count, tracks, viewer_follows) =
            tokio::try_join!(profile, followers, following, tracks, viewer_follows)?;

        Ok(ProfileView {
            profile: profile.unwrap_or_else(|| Profile::empty(subject)),
            follower_count,
            following_count,
            tracks,
            relationship: if is_own {
                Relationship::Own
            } else {
                Relationship::Other { viewer_follows }
            },
        })
    }

    /// Like [`aggregate`](Self::aggregate), but returns `Ok(None)` when a
    /// newer load or [`invalidate`](Self::invalidate) superseded this one.
    pub async fn load(
        &self,
        target: Option<UserId>,
        viewer: Option<UserId>,
    ) -> Result<Option<ProfileView>, Error> {
        let ticket = self.generation.begin();
        let outcome = self.aggregate(target, viewer).await;
        if !self.generation.is_current(ticket) {
            debug!(?target, "discarding stale profile aggregate");
            return Ok(None);
        }
        outcome.map(Some)
    }

    /// Discard every outstanding load, as when the page unmounts.
    pub fn invalidate(&self) {
        self.generation.invalidate();
    }
}

#[cfg(test)]
mod tests;
