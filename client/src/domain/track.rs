//! Track and genre records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Track identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Parse a track id from user input.
    pub fn parse(raw: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(raw.trim()).map(Self)
    }

    /// Generate a random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TrackId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Genre lookup identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreId(i64);

impl GenreId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Read-only genre reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    /// Identifier referenced by tracks.
    pub id: GenreId,
    /// Display name; the feed orders genres by this.
    pub name: String,
    /// Tooltip text.
    pub description: Option<String>,
}

/// Whether a track is visible to users other than its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Listed in the public feed and on the owner's public profile.
    #[default]
    Public,
    /// Only visible to the owner.
    Private,
}

impl Visibility {
    /// Map the stored `is_public` flag.
    pub const fn from_is_public(is_public: bool) -> Self {
        if is_public { Self::Public } else { Self::Private }
    }

    /// Stored `is_public` flag.
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }

    /// Label shown in the manage view.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

/// Which of an owner's tracks a query should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Only public tracks; used whenever the viewer is not the owner.
    PublicOnly,
    /// Every track; used for the owner's own views.
    All,
}

/// Stored track metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Track id.
    pub id: TrackId,
    /// Uploader.
    pub owner: UserId,
    /// Title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Album, if any.
    pub album: Option<String>,
    /// Genre reference, if any.
    pub genre_id: Option<GenreId>,
    /// Object path inside the audio bucket.
    pub audio_path: Option<String>,
    /// Object path of the cover image.
    pub image_path: Option<String>,
    /// Visibility flag.
    pub visibility: Visibility,
    /// MIME type recorded at upload.
    pub mime_type: Option<String>,
    /// Size in bytes recorded at upload.
    pub file_size: Option<u64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Author fields joined onto a listed track.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorSummary {
    /// Author's username.
    pub username: Option<String>,
    /// Author's avatar URL.
    pub avatar_url: Option<String>,
}

/// Track joined with the minimal author and genre fields needed for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackListing {
    /// Track row.
    pub track: Track,
    /// Joined author profile; absent when the author never saved one.
    pub author: Option<AuthorSummary>,
    /// Joined genre name.
    pub genre_name: Option<String>,
}

impl TrackListing {
    /// `artist • album` byline.
    ///
    /// # Examples
    /// ```
    /// # use trackshare::domain::{Track, TrackId, TrackListing, UserId, Visibility};
    /// # let track = Track {
    /// #     id: TrackId::random(), owner: UserId::random(), title: "Intro".into(),
    /// #     artist: "Nova".into(), album: Some("First Light".into()), genre_id: None,
    /// #     audio_path: None, image_path: None, visibility: Visibility::Public,
    /// #     mime_type: None, file_size: None, created_at: chrono::Utc::now(),
    /// # };
    /// let listing = TrackListing { track, author: None, genre_name: None };
    /// assert_eq!(listing.byline(), "Nova • First Light");
    /// ```
    pub fn byline(&self) -> String {
        match self.track.album.as_deref().filter(|album| !album.is_empty()) {
            Some(album) => format!("{} • {album}", self.track.artist),
            None => self.track.artist.clone(),
        }
    }

    /// Genre name, or `"No genre"`.
    pub fn genre_label(&self) -> &str {
        self.genre_name.as_deref().unwrap_or("No genre")
    }

    /// Author username, or the anonymous placeholder.
    pub fn author_label(&self) -> &str {
        super::display_username(
            self.author
                .as_ref()
                .and_then(|author| author.username.as_deref()),
        )
    }

    /// Rounded size in KiB, when recorded.
    pub fn size_kib(&self) -> Option<u64> {
        self.track.file_size.map(|bytes| (bytes + 512) / 1024)
    }
}

/// Metadata row inserted after the audio object has been stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrack {
    /// Uploader.
    pub owner: UserId,
    /// Title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Album, if any.
    pub album: Option<String>,
    /// Selected genre.
    pub genre_id: GenreId,
    /// Stored object path.
    pub audio_path: String,
    /// MIME type of the uploaded file.
    pub mime_type: String,
    /// Size of the uploaded file in bytes.
    pub file_size: u64,
    /// Visibility flag.
    pub visibility: Visibility,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn listing(album: Option<&str>, file_size: Option<u64>) -> TrackListing {
        TrackListing {
            track: Track {
                id: TrackId::random(),
                owner: UserId::random(),
                title: "Tide".to_owned(),
                artist: "Harbour".to_owned(),
                album: album.map(str::to_owned),
                genre_id: Some(GenreId::new(3)),
                audio_path: None,
                image_path: None,
                visibility: Visibility::Private,
                mime_type: Some("audio/mpeg".to_owned()),
                file_size,
                created_at: Utc::now(),
            },
            author: None,
            genre_name: None,
        }
    }

    #[rstest]
    #[case(None, "Harbour")]
    #[case(Some(""), "Harbour")]
    #[case(Some("Low Water"), "Harbour • Low Water")]
    fn byline_omits_missing_album(#[case] album: Option<&str>, #[case] expected: &str) {
        assert_eq!(listing(album, None).byline(), expected);
    }

    #[rstest]
    fn labels_fall_back_for_missing_joins() {
        let listing = listing(None, Some(2048));
        assert_eq!(listing.genre_label(), "No genre");
        assert_eq!(listing.author_label(), "Anonymous");
        assert_eq!(listing.size_kib(), Some(2));
    }

    #[rstest]
    fn visibility_round_trips_the_stored_flag() {
        assert!(Visibility::from_is_public(true).is_public());
        assert_eq!(Visibility::from_is_public(false), Visibility::Private);
    }
}
