//! Driven port for the binary object storage service.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::domain::{Bucket, ObjectPath, ObjectUpload};

use super::define_port_error;

define_port_error! {
    /// Errors raised by object storage adapters.
    pub enum StorageError {
        /// The storage service could not be reached.
        Transport => "storage transport failed: {message}",
        /// No object exists at the requested path.
        NotFound => "storage object not found: {message}",
        /// The service refused the request (quota, permissions, conflicts).
        Rejected => "storage request rejected: {message}",
        /// The service answered with something the adapter could not read.
        Decode => "storage response decode failed: {message}",
    }
}

/// Port for object storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes at a path.
    async fn upload(&self, object: &ObjectUpload) -> Result<(), StorageError>;

    /// Remove objects from a bucket.
    async fn remove(&self, bucket: Bucket, paths: &[ObjectPath]) -> Result<(), StorageError>;

    /// Issue a time-boxed read URL for a private object.
    async fn create_signed_url(
        &self,
        bucket: Bucket,
        path: &ObjectPath,
        ttl: Duration,
    ) -> Result<Url, StorageError>;

    /// Permanent URL of an object in a public bucket.
    fn public_url(&self, bucket: Bucket, path: &ObjectPath) -> Result<Url, StorageError>;
}
