//! Error type shared by the table-scoped repository ports.

use super::define_port_error;

define_port_error! {
    /// Errors raised by data store adapters.
    pub enum DataStoreError {
        /// The data store could not be reached.
        Connection => "data store connection failed: {message}",
        /// The query or mutation failed during execution.
        Query => "data store query failed: {message}",
        /// A uniqueness constraint rejected an insert.
        ///
        /// Adapters translate their backend's duplicate-key signal into this
        /// variant so services never depend on backend error codes.
        AlreadyExists => "row already exists: {message}",
        /// The backend refused the request for the current credentials.
        Unauthorized => "data store access denied: {message}",
        /// A row could not be decoded into a domain value.
        Decode => "data store row decode failed: {message}",
    }
}

impl DataStoreError {
    /// Whether the error is the abstract "already exists" signal.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
