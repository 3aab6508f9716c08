//! Track upload, listing and deletion for the track owner.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use super::error_mapping::{map_data_store_error, map_storage_error};
use super::ports::{ObjectStorage, TrackRepository};
use super::upload::{audio_object_path, UploadForm};
use super::{
    Bucket, Confirmation, Error, NewTrack, ObjectPath, ObjectUpload, TrackId, TrackListing,
    UserId, VisibilityScope,
};

/// Owner-side track operations.
pub struct TrackManager<T: ?Sized, S: ?Sized> {
    tracks: Arc<T>,
    storage: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<T, S> TrackManager<T, S>
where
    T: TrackRepository + ?Sized,
    S: ObjectStorage + ?Sized,
{
    /// Create a manager over the track table and object storage.
    pub fn new(tracks: Arc<T>, storage: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tracks,
            storage,
            clock,
        }
    }

    /// Validate the form, store the audio, then record the track.
    ///
    /// Nothing is sent when validation fails. When the record insert fails
    /// after the object was stored, the object stays in storage and the
    /// failure is logged with its path.
    pub async fn upload(&self, owner: UserId, form: UploadForm) -> Result<NewTrack, Error> {
        let upload = form.validate()?;
        let file_size = upload.file.size();
        let path = audio_object_path(
            owner,
            self.clock.utc().timestamp_millis(),
            &upload.file.name,
        )?;
        let object = ObjectUpload {
            bucket: Bucket::Audio,
            path,
            bytes: upload.file.bytes,
            content_type: upload.file.content_type,
            overwrite: true,
        };
        self.storage
            .upload(&object)
            .await
            .map_err(|error| map_storage_error("Upload error", error))?;

        let record = NewTrack {
            owner,
            title: upload.title,
            artist: upload.artist,
            album: upload.album,
            genre_id: upload.genre,
            audio_path: object.path.as_str().to_owned(),
            mime_type: object.content_type,
            file_size,
            visibility: upload.visibility,
        };
        if let Err(error) = self.tracks.insert(&record).await {
            warn!(
                path = %object.path,
                %error,
                "track record insert failed; uploaded object left in storage"
            );
            return Err(map_data_store_error("Database error", error));
        }
        info!(%owner, path = %record.audio_path, "track uploaded");
        Ok(record)
    }

    /// Every track `owner` uploaded, newest first.
    pub async fn list_own(&self, owner: UserId) -> Result<Vec<TrackListing>, Error> {
        self.tracks
            .list_by_owner(&owner, VisibilityScope::All)
            .await
            .map_err(|error| map_data_store_error("Error loading tracks", error))
    }

    /// Delete one of `owner`'s tracks after confirmation.
    ///
    /// Returns `false` without any request when declined. Once the record is
    /// gone the delete succeeds; failing to remove the stored object is only
    /// logged.
    pub async fn delete(
        &self,
        owner: UserId,
        track: TrackId,
        confirmation: Confirmation,
    ) -> Result<bool, Error> {
        if !confirmation.is_confirmed() {
            return Ok(false);
        }
        let found = self
            .tracks
            .find_owned(&track, &owner)
            .await
            .map_err(|error| map_data_store_error("Error fetching track", error))?
            .ok_or_else(|| Error::not_found(format!("track {track} not found")))?;

        self.tracks
            .delete(&track, &owner)
            .await
            .map_err(|error| map_data_store_error("Error deleting track", error))?;

        if let Some(raw) = found.audio_path {
            self.remove_object(raw).await;
        }
        info!(%owner, %track, "track deleted");
        Ok(true)
    }

    async fn remove_object(&self, raw: String) {
        let path = match ObjectPath::new(raw) {
            Ok(path) => path,
            Err(error) => {
                warn!(%error, "stored audio path is malformed; skipping removal");
                return;
            }
        };
        if let Err(error) = self.storage.remove(Bucket::Audio, &[path.clone()]).await {
            warn!(path = %path, %error, "error deleting file from storage");
        }
    }
}
