//! Client orchestration for a social audio-sharing service.
//!
//! The hosted backend owns persistence, authentication and file storage.
//! This crate holds the client side: session gating, route guarding, feed
//! loading with genre filters, signed media resolution, profile aggregation,
//! follow toggling, follower lists, uploads and profile editing.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
