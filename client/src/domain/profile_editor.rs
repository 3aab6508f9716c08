//! Editing the signed-in user's own profile.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;
use url::Url;

use super::error_mapping::{map_data_store_error, map_storage_error};
use super::ports::{ObjectStorage, ProfileRepository};
use super::upload::{SelectedFile, sanitize_file_name};
use super::{
    Bucket, Error, ObjectPath, ObjectUpload, Profile, ProfileRecord, Session, UserId, Username,
};

/// Greeting fallback when neither a username nor an email is known.
pub const DEFAULT_DISPLAY_NAME: &str = "user";

/// Values submitted from the profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Requested username.
    pub username: String,
    /// Biography; blank clears it.
    pub bio: String,
    /// Location; blank clears it.
    pub location: String,
    /// Avatar URL, usually from [`ProfileEditor::upload_avatar`].
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Prefill the form from a stored profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
            location: profile.location.clone().unwrap_or_default(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Name to greet the signed-in user with: username, then email, then
/// [`DEFAULT_DISPLAY_NAME`].
pub fn display_name(session: &Session, profile: Option<&Profile>) -> String {
    profile
        .and_then(|profile| profile.username.as_deref())
        .filter(|name| !name.trim().is_empty())
        .or_else(|| session.email())
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_owned()
}

/// Own-profile reads and writes.
pub struct ProfileEditor<P: ?Sized, S: ?Sized> {
    profiles: Arc<P>,
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<P, S> ProfileEditor<P, S>
where
    P: ProfileRepository + ?Sized,
    S: ObjectStorage + ?Sized,
{
    /// Create an editor over the profile table and object storage.
    pub fn new(profiles: Arc<P>, storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles,
            storage,
            clock,
        }
    }

    /// Stored profile, or an empty one if the user never saved it.
    pub async fn load(&self, user: UserId) -> Result<Profile, Error> {
        self.profiles
            .find_by_id(&user)
            .await
            .map(|found| found.unwrap_or_else(|| Profile::empty(user)))
            .map_err(|error| map_data_store_error("Error fetching profile", error))
    }

    /// Validate and upsert the profile.
    pub async fn save(&self, user: UserId, update: ProfileUpdate) -> Result<Profile, Error> {
        let username = Username::new(update.username.trim())
            .map_err(|error| Error::invalid_field("username", error.to_string()))?;
        let record = ProfileRecord {
            id: user,
            username,
            bio: non_blank(update.bio),
            location: non_blank(update.location),
            avatar_url: update.avatar_url.and_then(non_blank),
            updated_at: self.clock.utc(),
        };
        self.profiles
            .upsert(&record)
            .await
            .map_err(|error| map_data_store_error("Error updating profile", error))?;
        info!(%user, "profile updated");
        Ok(Profile::from(record))
    }

    /// Store an avatar image and return its public URL.
    pub async fn upload_avatar(&self, user: UserId, file: SelectedFile) -> Result<Url, Error> {
        if !file.content_type.starts_with("image/") {
            return Err(Error::invalid_field(
                "avatar",
                "Please select an image file.",
            ));
        }
        let path = ObjectPath::new(format!("{user}/{}", sanitize_file_name(&file.name)))
            .map_err(|error| Error::internal(format!("invalid avatar path: {error}")))?;
        let object = ObjectUpload {
            bucket: Bucket::Avatars,
            path,
            bytes: file.bytes,
            content_type: file.content_type,
            overwrite: true,
        };
        self.storage
            .upload(&object)
            .await
            .map_err(|error| map_storage_error("Avatar upload error", error))?;
        self.storage
            .public_url(Bucket::Avatars, &object.path)
            .map_err(|error| map_storage_error("Avatar URL error", error))
    }
}
