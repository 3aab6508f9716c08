//! Port for the `tracks` table.

use async_trait::async_trait;

use crate::domain::{NewTrack, Track, TrackId, TrackListing, UserId, VisibilityScope};

use super::DataStoreError;

/// Track reads and owner mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Newest public tracks, joined with author and genre, at most `limit`.
    async fn list_public(&self, limit: usize) -> Result<Vec<TrackListing>, DataStoreError>;

    /// Tracks uploaded by `owner`, newest first, joined with author and genre.
    async fn list_by_owner(
        &self,
        owner: &UserId,
        scope: VisibilityScope,
    ) -> Result<Vec<TrackListing>, DataStoreError>;

    /// Fetch a track only if `owner` uploaded it.
    async fn find_owned(&self, id: &TrackId, owner: &UserId)
    -> Result<Option<Track>, DataStoreError>;

    /// Insert a metadata row.
    async fn insert(&self, track: &NewTrack) -> Result<(), DataStoreError>;

    /// Delete a metadata row owned by `owner`.
    async fn delete(&self, id: &TrackId, owner: &UserId) -> Result<(), DataStoreError>;
}
