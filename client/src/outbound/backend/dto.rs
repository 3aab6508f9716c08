//! DTOs for the backend's REST, storage and auth JSON payloads.
//!
//! Adapters decode into these transport DTOs first, then map into domain
//! records in one pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AccessToken, AuthorSummary, Genre, GenreId, NewTrack, Profile, ProfileRecord, ProfileSummary,
    RelationKind, Session, Track, TrackListing, UserId, Visibility,
};

/// Embedded relations requested alongside track rows.
pub(super) const TRACK_LISTING_COLUMNS: &str = "*,profiles(username,avatar_url),genres(name)";

const fn default_public() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(super) struct TrackRowDto {
    pub(super) id: Uuid,
    pub(super) user_id: Uuid,
    pub(super) title: String,
    pub(super) artist: String,
    pub(super) album: Option<String>,
    pub(super) genre_id: Option<i64>,
    pub(super) audio_path: Option<String>,
    pub(super) image_path: Option<String>,
    #[serde(default = "default_public")]
    pub(super) is_public: bool,
    pub(super) mime_type: Option<String>,
    pub(super) file_size: Option<i64>,
    pub(super) created_at: DateTime<Utc>,
    #[serde(default)]
    pub(super) profiles: Option<AuthorDto>,
    #[serde(default)]
    pub(super) genres: Option<GenreNameDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthorDto {
    pub(super) username: Option<String>,
    pub(super) avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GenreNameDto {
    pub(super) name: String,
}

impl TrackRowDto {
    pub(super) fn into_listing(self) -> Result<TrackListing, String> {
        let author = self.profiles.as_ref().map(|author| AuthorSummary {
            username: author.username.clone(),
            avatar_url: author.avatar_url.clone(),
        });
        let genre_name = self.genres.as_ref().map(|genre| genre.name.clone());
        Ok(TrackListing {
            track: self.into_track()?,
            author,
            genre_name,
        })
    }

    pub(super) fn into_track(self) -> Result<Track, String> {
        let file_size = self
            .file_size
            .map(|size| {
                u64::try_from(size)
                    .map_err(|_| format!("track {} has negative file_size {size}", self.id))
            })
            .transpose()?;
        Ok(Track {
            id: self.id.into(),
            owner: self.user_id.into(),
            title: self.title,
            artist: self.artist,
            album: self.album,
            genre_id: self.genre_id.map(GenreId::new),
            audio_path: self.audio_path,
            image_path: self.image_path,
            visibility: Visibility::from_is_public(self.is_public),
            mime_type: self.mime_type,
            file_size,
            created_at: self.created_at,
        })
    }
}

pub(super) fn into_listings(rows: Vec<TrackRowDto>) -> Result<Vec<TrackListing>, String> {
    rows.into_iter().map(TrackRowDto::into_listing).collect()
}

#[derive(Debug, Serialize)]
pub(super) struct NewTrackDto<'a> {
    pub(super) user_id: &'a Uuid,
    pub(super) title: &'a str,
    pub(super) artist: &'a str,
    pub(super) album: Option<&'a str>,
    pub(super) genre_id: i64,
    pub(super) audio_path: &'a str,
    pub(super) mime_type: &'a str,
    pub(super) file_size: u64,
    pub(super) is_public: bool,
}

impl<'a> From<&'a NewTrack> for NewTrackDto<'a> {
    fn from(track: &'a NewTrack) -> Self {
        Self {
            user_id: track.owner.as_uuid(),
            title: &track.title,
            artist: &track.artist,
            album: track.album.as_deref(),
            genre_id: track.genre_id.get(),
            audio_path: &track.audio_path,
            mime_type: &track.mime_type,
            file_size: track.file_size,
            is_public: track.visibility.is_public(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GenreDto {
    pub(super) id: i64,
    pub(super) name: String,
    pub(super) description: Option<String>,
}

impl From<GenreDto> for Genre {
    fn from(value: GenreDto) -> Self {
        Self {
            id: GenreId::new(value.id),
            name: value.name,
            description: value.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileRowDto {
    pub(super) id: Uuid,
    pub(super) username: Option<String>,
    pub(super) bio: Option<String>,
    pub(super) location: Option<String>,
    pub(super) avatar_url: Option<String>,
}

impl From<ProfileRowDto> for Profile {
    fn from(value: ProfileRowDto) -> Self {
        Self {
            id: value.id.into(),
            username: value.username,
            bio: value.bio,
            location: value.location,
            avatar_url: value.avatar_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileSummaryDto {
    pub(super) id: Uuid,
    pub(super) username: Option<String>,
    pub(super) avatar_url: Option<String>,
}

impl From<ProfileSummaryDto> for ProfileSummary {
    fn from(value: ProfileSummaryDto) -> Self {
        Self {
            id: value.id.into(),
            username: value.username,
            avatar_url: value.avatar_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProfileUpsertDto<'a> {
    pub(super) id: &'a Uuid,
    pub(super) username: &'a str,
    pub(super) bio: Option<&'a str>,
    pub(super) location: Option<&'a str>,
    pub(super) avatar_url: Option<&'a str>,
    pub(super) updated_at: DateTime<Utc>,
}

impl<'a> From<&'a ProfileRecord> for ProfileUpsertDto<'a> {
    fn from(record: &'a ProfileRecord) -> Self {
        Self {
            id: record.id.as_uuid(),
            username: record.username.as_ref(),
            bio: record.bio.as_deref(),
            location: record.location.as_deref(),
            avatar_url: record.avatar_url.as_deref(),
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FollowRowDto<'a> {
    pub(super) follower_id: &'a Uuid,
    pub(super) followed_id: &'a Uuid,
}

/// One side of a follow row, as returned when selecting a single column.
#[derive(Debug, Deserialize)]
pub(super) struct CounterpartDto {
    pub(super) follower_id: Option<Uuid>,
    pub(super) followed_id: Option<Uuid>,
}

impl CounterpartDto {
    pub(super) fn into_user(self, kind: RelationKind) -> Result<UserId, String> {
        let id = match kind {
            RelationKind::Followers => self.follower_id,
            RelationKind::Following => self.followed_id,
        };
        id.map(UserId::from)
            .ok_or_else(|| format!("follow row missing {}", kind.counterpart_column()))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SignedUrlDto {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    pub(super) signed_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SignRequestDto {
    #[serde(rename = "expiresIn")]
    pub(super) expires_in: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct RemoveRequestDto<'a> {
    pub(super) prefixes: Vec<&'a str>,
}

/// Error body returned by the REST table API.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RestErrorDto {
    pub(super) code: Option<String>,
    pub(super) message: Option<String>,
}

/// Error body returned by the storage API. `statusCode` is a string on
/// current servers and a number on older ones.
#[derive(Debug, Default, Deserialize)]
pub(super) struct StorageErrorDto {
    #[serde(rename = "statusCode")]
    pub(super) status_code: Option<serde_json::Value>,
    pub(super) error: Option<String>,
    pub(super) message: Option<String>,
}

impl StorageErrorDto {
    pub(super) fn is_not_found(&self) -> bool {
        let status = self.status_code.as_ref().map(|value| match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        });
        status.as_deref() == Some("404")
            || self
                .error
                .as_deref()
                .is_some_and(|error| error.eq_ignore_ascii_case("not_found"))
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PasswordGrantDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshGrantDto<'a> {
    pub(super) refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    pub(super) refresh_token: Option<String>,
    pub(super) expires_in: Option<i64>,
    pub(super) expires_at: Option<i64>,
    pub(super) user: TokenUserDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenUserDto {
    pub(super) id: Uuid,
    pub(super) email: Option<String>,
}

impl TokenResponseDto {
    /// Build a session; `expires_at` wins over `expires_in` when both are
    /// present.
    pub(super) fn into_session(self, now: DateTime<Utc>) -> Session {
        let expiry = self
            .expires_at
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .or_else(|| {
                self.expires_in
                    .and_then(chrono::TimeDelta::try_seconds)
                    .and_then(|delta| now.checked_add_signed(delta))
            });
        let mut session = Session::new(
            self.user.id.into(),
            self.user.email,
            AccessToken::new(self.access_token),
        );
        if let Some(refresh) = self.refresh_token {
            session = session.with_refresh_token(AccessToken::new(refresh));
        }
        if let Some(expiry) = expiry {
            session = session.with_expiry(expiry);
        }
        session
    }
}

/// Error body returned by the auth API. Older servers send
/// `error`/`error_description`; newer ones send `error_code`/`msg`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct AuthErrorDto {
    pub(super) error: Option<String>,
    pub(super) error_description: Option<String>,
    pub(super) error_code: Option<String>,
    pub(super) msg: Option<String>,
}

impl AuthErrorDto {
    pub(super) fn is_invalid_credentials(&self) -> bool {
        matches!(self.error.as_deref(), Some("invalid_grant"))
            || matches!(self.error_code.as_deref(), Some("invalid_credentials"))
    }

    pub(super) fn detail(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.error_code.as_deref())
            .or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    //! Decoding coverage for backend payloads.

    use super::*;
    use rstest::rstest;

    const OWNER: &str = "6b7d8c2e-5f1a-4e0b-9b3a-2f1c0d9e8a7b";

    #[rstest]
    fn track_row_with_joins_maps_to_listing() {
        let raw = format!(
            r#"{{
                "id": "11111111-2222-4333-8444-555555555555",
                "user_id": "{OWNER}",
                "title": "Tide",
                "artist": "Harbour",
                "album": null,
                "genre_id": 4,
                "audio_path": "{OWNER}/1700000000000-tide.mp3",
                "image_path": null,
                "is_public": false,
                "mime_type": "audio/mpeg",
                "file_size": 4096,
                "created_at": "2024-05-01T12:00:00+00:00",
                "profiles": {{"username": "harbour", "avatar_url": null}},
                "genres": {{"name": "Ambient"}}
            }}"#
        );
        let row: TrackRowDto = serde_json::from_str(&raw).expect("row decodes");
        let listing = row.into_listing().expect("row maps");

        assert_eq!(listing.track.visibility, Visibility::Private);
        assert_eq!(listing.track.file_size, Some(4096));
        assert_eq!(listing.track.genre_id, Some(GenreId::new(4)));
        assert_eq!(listing.genre_name.as_deref(), Some("Ambient"));
        assert_eq!(
            listing.author.and_then(|author| author.username).as_deref(),
            Some("harbour")
        );
    }

    #[rstest]
    fn missing_joins_stay_absent() {
        let raw = format!(
            r#"{{"id": "11111111-2222-4333-8444-555555555555", "user_id": "{OWNER}",
                "title": "Tide", "artist": "Harbour", "album": null, "genre_id": null,
                "audio_path": null, "image_path": null, "mime_type": null,
                "file_size": null, "created_at": "2024-05-01T12:00:00Z",
                "profiles": null, "genres": null}}"#
        );
        let row: TrackRowDto = serde_json::from_str(&raw).expect("row decodes");
        let listing = row.into_listing().expect("row maps");

        assert!(listing.author.is_none());
        assert_eq!(listing.genre_label(), "No genre");
        assert!(listing.track.visibility.is_public());
    }

    #[rstest]
    fn negative_file_size_is_rejected() {
        let raw = format!(
            r#"{{"id": "11111111-2222-4333-8444-555555555555", "user_id": "{OWNER}",
                "title": "t", "artist": "a", "album": null, "genre_id": null,
                "audio_path": null, "image_path": null, "mime_type": null,
                "file_size": -1, "created_at": "2024-05-01T12:00:00Z"}}"#
        );
        let row: TrackRowDto = serde_json::from_str(&raw).expect("row decodes");
        let error = row.into_track().expect_err("negative size rejected");
        assert!(error.contains("negative file_size"));
    }

    #[rstest]
    #[case(r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#, true)]
    #[case(r#"{"statusCode":404,"error":"Not found","message":"x"}"#, true)]
    #[case(r#"{"statusCode":"403","error":"Unauthorized","message":"x"}"#, false)]
    fn storage_not_found_detection(#[case] raw: &str, #[case] expected: bool) {
        let dto: StorageErrorDto = serde_json::from_str(raw).expect("error decodes");
        assert_eq!(dto.is_not_found(), expected);
    }

    #[rstest]
    #[case(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)]
    #[case(r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#)]
    fn both_auth_error_shapes_signal_bad_credentials(#[case] raw: &str) {
        let dto: AuthErrorDto = serde_json::from_str(raw).expect("error decodes");
        assert!(dto.is_invalid_credentials());
        assert_eq!(dto.detail(), Some("Invalid login credentials"));
    }

    #[rstest]
    fn token_response_prefers_absolute_expiry() {
        let raw = format!(
            r#"{{"access_token":"jwt","refresh_token":"r","expires_in":3600,
                "expires_at":1714564800,"user":{{"id":"{OWNER}","email":"a@b.test"}}}}"#
        );
        let dto: TokenResponseDto = serde_json::from_str(&raw).expect("token decodes");
        let session = dto.into_session(Utc::now());

        assert_eq!(session.email(), Some("a@b.test"));
        assert_eq!(
            session.expires_at().map(|expiry| expiry.timestamp()),
            Some(1_714_564_800)
        );
        assert_eq!(
            session.refresh_token().map(AccessToken::expose),
            Some("r")
        );
    }

    #[rstest]
    fn counterpart_picks_the_other_column() {
        let dto: CounterpartDto =
            serde_json::from_str(&format!(r#"{{"follower_id":"{OWNER}"}}"#)).expect("decodes");
        assert_eq!(
            dto.into_user(RelationKind::Followers).map(|id| id.to_string()),
            Ok(OWNER.to_owned())
        );
    }
}
