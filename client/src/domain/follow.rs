//! Follow relationships.

use super::UserId;

/// Directed edge recording that `follower` follows `followed`.
///
/// Existence is the only fact an edge carries; the backend keeps at most one
/// edge per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowEdge {
    /// User doing the following.
    pub follower: UserId,
    /// User being followed.
    pub followed: UserId,
}

impl FollowEdge {
    /// Build an edge.
    pub const fn new(follower: UserId, followed: UserId) -> Self {
        Self { follower, followed }
    }

    /// Whether both ends name the same user.
    pub fn is_self_loop(&self) -> bool {
        self.follower == self.followed
    }
}

/// Direction of a relationship list or count, relative to a subject user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Users who follow the subject (`followed_id = subject`).
    Followers,
    /// Users the subject follows (`follower_id = subject`).
    Following,
}

impl RelationKind {
    /// Column that must equal the subject id.
    pub const fn subject_column(self) -> &'static str {
        match self {
            Self::Followers => "followed_id",
            Self::Following => "follower_id",
        }
    }

    /// Column holding the counterpart id.
    pub const fn counterpart_column(self) -> &'static str {
        match self {
            Self::Followers => "follower_id",
            Self::Following => "followed_id",
        }
    }

    /// Heading for list views.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Followers => "Followers",
            Self::Following => "Following",
        }
    }
}

/// Follow status and the follower counter shown next to the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowState {
    /// Whether the viewer follows the profile owner.
    pub following: bool,
    /// Displayed follower count of the profile owner.
    pub follower_count: u64,
}

impl FollowState {
    /// State after a successful follow.
    #[must_use]
    pub const fn followed(self) -> Self {
        Self {
            following: true,
            follower_count: self.follower_count.saturating_add(1),
        }
    }

    /// State after a successful unfollow; the counter never goes below zero.
    #[must_use]
    pub const fn unfollowed(self) -> Self {
        Self {
            following: false,
            follower_count: self.follower_count.saturating_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn unfollow_floors_counter_at_zero() {
        let state = FollowState {
            following: true,
            follower_count: 0,
        };
        assert_eq!(state.unfollowed().follower_count, 0);
    }

    #[rstest]
    #[case(RelationKind::Followers, "followed_id", "follower_id")]
    #[case(RelationKind::Following, "follower_id", "followed_id")]
    fn relation_columns_are_mirrored(
        #[case] kind: RelationKind,
        #[case] subject: &str,
        #[case] counterpart: &str,
    ) {
        assert_eq!(kind.subject_column(), subject);
        assert_eq!(kind.counterpart_column(), counterpart);
    }

    #[rstest]
    fn self_loop_is_detected() {
        let id = UserId::random();
        assert!(FollowEdge::new(id, id).is_self_loop());
        assert!(!FollowEdge::new(id, UserId::random()).is_self_loop());
    }
}
