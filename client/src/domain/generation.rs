//! Generation counters for discarding superseded async results.
//!
//! A view begins a request by taking a [`GenerationTicket`]. When the
//! response arrives it is applied only if the ticket is still current;
//! beginning a newer request or invalidating the counter (unmount) makes
//! every outstanding ticket stale.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request counter owned by one view instance.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

/// Proof of which request a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

impl RequestGeneration {
    /// Create a counter with no outstanding requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding every earlier ticket.
    ///
    /// # Examples
    /// ```
    /// use trackshare::domain::RequestGeneration;
    ///
    /// let generation = RequestGeneration::new();
    /// let first = generation.begin();
    /// let second = generation.begin();
    /// assert!(!generation.is_current(first));
    /// assert!(generation.is_current(second));
    /// ```
    pub fn begin(&self) -> GenerationTicket {
        GenerationTicket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Make every outstanding ticket stale, as on unmount.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether a response for `ticket` should still be applied.
    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }
}
