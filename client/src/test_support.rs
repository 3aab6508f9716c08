//! Test utilities for the trackshare crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for tests and when the
//! `test-support` feature is enabled.

mod clock;
mod memory_auth;
mod memory_backend;

pub use clock::FixtureClock;
pub use memory_auth::InMemoryAuth;
pub use memory_backend::{InMemoryBackend, Operation};

use std::io;

use tempfile::TempDir;

use crate::outbound::session_store::FileSessionStore;

/// Session store in a fresh temporary directory.
///
/// Keep the returned [`TempDir`] alive for as long as the store is used.
///
/// # Errors
///
/// Returns an error when the temporary directory cannot be created.
pub fn temp_session_store() -> io::Result<(TempDir, FileSessionStore)> {
    let dir = TempDir::new()?;
    let store = FileSessionStore::new(dir.path().join("session.json"));
    Ok((dir, store))
}
