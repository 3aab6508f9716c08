//! Port for the `profiles` table.

use async_trait::async_trait;

use crate::domain::{Profile, ProfileRecord, ProfileSummary, UserId};

use super::DataStoreError;

/// Profile reads and owner writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch one profile; `None` when the user never saved one.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, DataStoreError>;

    /// Batch-fetch minimal fields for `ids`.
    ///
    /// Order of the result is unspecified and ids without a row are omitted.
    async fn find_summaries(&self, ids: &[UserId]) -> Result<Vec<ProfileSummary>, DataStoreError>;

    /// Insert or update the profile keyed on `id`.
    async fn upsert(&self, record: &ProfileRecord) -> Result<(), DataStoreError>;
}
