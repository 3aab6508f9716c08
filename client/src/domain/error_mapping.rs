//! Translation of port errors into domain [`Error`]s.
//!
//! Services call these at the point a port result crosses back into the
//! domain so data-store failures, storage failures and auth failures keep
//! distinct [`ErrorCode`](super::ErrorCode)s.

use super::Error;
use super::ports::{AuthProviderError, DataStoreError, StorageError};

/// Map a data store failure, prefixing the step that failed.
pub(crate) fn map_data_store_error(context: &str, error: DataStoreError) -> Error {
    match error {
        DataStoreError::Connection { message } => {
            Error::service_unavailable(format!("{context}: data store unavailable: {message}"))
        }
        DataStoreError::Unauthorized { message } => {
            Error::forbidden(format!("{context}: access denied: {message}"))
        }
        DataStoreError::AlreadyExists { message } => {
            Error::conflict(format!("{context}: already exists: {message}"))
        }
        DataStoreError::Query { message } | DataStoreError::Decode { message } => {
            Error::data_store(format!("{context}: {message}"))
        }
    }
}

/// Map an object storage failure, prefixing the step that failed.
pub(crate) fn map_storage_error(context: &str, error: StorageError) -> Error {
    match error {
        StorageError::NotFound { message } => {
            Error::not_found(format!("{context}: object not found: {message}"))
        }
        StorageError::Transport { message }
        | StorageError::Rejected { message }
        | StorageError::Decode { message } => Error::storage(format!("{context}: {message}")),
    }
}

/// Map an auth provider failure.
pub(crate) fn map_auth_error(error: AuthProviderError) -> Error {
    match error {
        AuthProviderError::InvalidCredentials { .. } => {
            Error::unauthorized("Invalid email or password.")
        }
        AuthProviderError::Transport { message } | AuthProviderError::Unconfigured { message } => {
            Error::service_unavailable(format!("auth provider unavailable: {message}"))
        }
        AuthProviderError::Rejected { message } => {
            Error::unauthorized(format!("auth request rejected: {message}"))
        }
        AuthProviderError::SessionStore { message } => {
            Error::internal(format!("session store failed: {message}"))
        }
    }
}
