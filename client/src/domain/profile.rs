//! Profile records as read from and written to the `profiles` table.

use chrono::{DateTime, Utc};

use super::{UserId, Username};

/// Placeholder shown when a profile has no username.
pub const ANONYMOUS_USERNAME: &str = "Anonymous";

/// Full profile as displayed on a profile page.
///
/// Text fields are kept as stored; validation only applies on write through
/// [`ProfileRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Owner id (equal to the auth user id).
    pub id: UserId,
    /// Public handle.
    pub username: Option<String>,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Free-form location.
    pub location: Option<String>,
    /// Public avatar URL.
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Profile with no fields set, used before the owner first saves one.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            username: None,
            bio: None,
            location: None,
            avatar_url: None,
        }
    }

    /// Username for display, falling back to [`ANONYMOUS_USERNAME`].
    pub fn display_username(&self) -> &str {
        display_username(self.username.as_deref())
    }
}

/// Minimal profile fields used by lists and track bylines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Owner id.
    pub id: UserId,
    /// Public handle.
    pub username: Option<String>,
    /// Public avatar URL.
    pub avatar_url: Option<String>,
}

/// Validated profile row written by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Owner id; the upsert conflict key.
    pub id: UserId,
    /// Validated handle.
    pub username: Username,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Free-form location.
    pub location: Option<String>,
    /// Public avatar URL.
    pub avatar_url: Option<String>,
    /// Write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRecord> for Profile {
    fn from(value: ProfileRecord) -> Self {
        Self {
            id: value.id,
            username: Some(value.username.into()),
            bio: value.bio,
            location: value.location,
            avatar_url: value.avatar_url,
        }
    }
}

/// Username for display, falling back to [`ANONYMOUS_USERNAME`] when blank.
pub fn display_username(username: Option<&str>) -> &str {
    username
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(ANONYMOUS_USERNAME)
}
