//! Load state of one remotely fetched value.

use super::Error;

/// State of one fetch slot in a view.
///
/// `Loading` never carries data: starting a fetch clears whatever the slot
/// held, so an empty `Ready` and an in-flight `Loading` stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub enum Remote<T> {
    /// Nothing requested yet.
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request succeeded.
    Ready(T),
    /// The last request failed; the view offers a retry.
    Failed(Error),
}

impl<T> Remote<T> {
    /// Value of a successful fetch.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Error of a failed fetch.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether a retry control should be shown.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> From<Result<T, Error>> for Remote<T> {
    fn from(value: Result<T, Error>) -> Self {
        match value {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Failed(error),
        }
    }
}
