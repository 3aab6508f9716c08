//! Follower and following lists.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error_mapping::map_data_store_error;
use super::ports::{FollowRepository, ProfileRepository};
use super::route_guard::Route;
use super::{display_username, Error, RelationKind, UserId};

/// One row of a follower/following list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEntry {
    /// Counterpart user.
    pub user: UserId,
    /// Username, or the anonymous placeholder when no profile exists.
    pub username: String,
    /// Avatar, when set.
    pub avatar_url: Option<String>,
    /// Where selecting the entry navigates.
    pub route: Route,
}

/// Loads the counterpart list for one side of the follow relation.
pub struct RelationList<F: ?Sized, P: ?Sized> {
    follows: Arc<F>,
    profiles: Arc<P>,
}

impl<F, P> RelationList<F, P>
where
    F: FollowRepository + ?Sized,
    P: ProfileRepository + ?Sized,
{
    /// Create a loader over the follow and profile repositories.
    pub fn new(follows: Arc<F>, profiles: Arc<P>) -> Self {
        Self { follows, profiles }
    }

    /// Entries for `subject`'s followers or followed users, in relation
    /// order with duplicates removed.
    pub async fn load(
        &self,
        subject: UserId,
        kind: RelationKind,
        viewer: Option<UserId>,
    ) -> Result<Vec<RelationEntry>, Error> {
        let counterparts = self
            .follows
            .list_counterparts(&subject, kind)
            .await
            .map_err(|error| map_data_store_error("Error fetching relations", error))?;

        let mut seen = HashSet::new();
        let ordered: Vec<UserId> = counterparts
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        if ordered.is_empty() {
            return Ok(Vec::new());
        }

        let mut summaries: HashMap<UserId, _> = self
            .profiles
            .find_summaries(&ordered)
            .await
            .map_err(|error| map_data_store_error("Error fetching profiles", error))?
            .into_iter()
            .map(|summary| (summary.id, summary))
            .collect();

        Ok(ordered
            .into_iter()
            .map(|user| {
                let summary = summaries.remove(&user);
                let (username, avatar_url) = summary.map_or((None, None), |summary| {
                    (summary.username, summary.avatar_url)
                });
                RelationEntry {
                    user,
                    username: display_username(username.as_deref()).to_owned(),
                    avatar_url,
                    route: Route::profile_of(user, viewer),
                }
            })
            .collect())
    }
}
