//! Port for the `followers` relationship table.

use async_trait::async_trait;

use crate::domain::{FollowEdge, RelationKind, UserId};

use super::DataStoreError;

/// Follow edge reads and writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Count edges where `subject` sits on the side given by `kind`.
    async fn count(&self, subject: &UserId, kind: RelationKind) -> Result<u64, DataStoreError>;

    /// Whether the edge exists.
    async fn exists(&self, edge: &FollowEdge) -> Result<bool, DataStoreError>;

    /// Insert an edge.
    ///
    /// Returns [`DataStoreError::AlreadyExists`] when the pair is present.
    async fn insert(&self, edge: &FollowEdge) -> Result<(), DataStoreError>;

    /// Delete an edge. Deleting a missing edge succeeds.
    async fn delete(&self, edge: &FollowEdge) -> Result<(), DataStoreError>;

    /// Counterpart ids for `subject`, in the store's relation order.
    async fn list_counterparts(
        &self,
        subject: &UserId,
        kind: RelationKind,
    ) -> Result<Vec<UserId>, DataStoreError>;
}
