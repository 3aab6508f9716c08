//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the domain expects to interact with the hosted
//! backend: the auth provider, the table-scoped data store and object
//! storage. Each trait exposes strongly typed errors so adapters map their
//! failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_provider;
mod data_store_error;
mod follow_repository;
mod genre_repository;
mod object_storage;
mod profile_repository;
mod track_repository;

#[cfg(test)]
pub use auth_provider::MockAuthProvider;
pub use auth_provider::{AuthProvider, AuthProviderError, AuthSubscription};
pub use data_store_error::DataStoreError;
#[cfg(test)]
pub use follow_repository::MockFollowRepository;
pub use follow_repository::FollowRepository;
#[cfg(test)]
pub use genre_repository::MockGenreRepository;
pub use genre_repository::GenreRepository;
#[cfg(test)]
pub use object_storage::MockObjectStorage;
pub use object_storage::{ObjectStorage, StorageError};
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::ProfileRepository;
#[cfg(test)]
pub use track_repository::MockTrackRepository;
pub use track_repository::TrackRepository;
