//! Port for the read-only `genres` lookup table.

use async_trait::async_trait;

use crate::domain::Genre;

use super::DataStoreError;

/// Genre lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenreRepository: Send + Sync {
    /// Every genre, ordered by name ascending.
    async fn list_by_name(&self) -> Result<Vec<Genre>, DataStoreError>;
}
