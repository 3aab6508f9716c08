//! Signed media resolution for private audio objects.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use super::ports::ObjectStorage;
use super::{Bucket, ObjectPath, RequestGeneration};

/// Validity window requested for signed audio URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(300);

/// Text shown in place of a player whose URL could not be issued.
pub const AUDIO_UNAVAILABLE: &str = "Audio unavailable";

/// State of one player's URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaState {
    /// The signed URL has been requested.
    Resolving,
    /// The player may stream from this URL until it expires.
    Resolved(Url),
    /// No URL could be issued; holds the text to display.
    Failed(String),
}

impl MediaState {
    /// Resolved URL, if any.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Resolved(url) => Some(url),
            Self::Resolving | Self::Failed(_) => None,
        }
    }
}

/// One mounted player bound to a stored audio path.
///
/// The URL is requested once per mount; a remount is a new instance.
/// Results arriving after [`unmount`](Self::unmount) are dropped.
pub struct MountedMedia<S: ?Sized> {
    storage: Arc<S>,
    path: String,
    requested: AtomicBool,
    mounted: AtomicBool,
    generation: RequestGeneration,
    state: watch::Sender<MediaState>,
}

impl<S> MountedMedia<S>
where
    S: ObjectStorage + ?Sized,
{
    /// Mount a player for `path` in the `audio` bucket.
    pub fn new(storage: Arc<S>, path: impl Into<String>) -> Self {
        let (state, _) = watch::channel(MediaState::Resolving);
        Self {
            storage,
            path: path.into(),
            requested: AtomicBool::new(false),
            mounted: AtomicBool::new(true),
            generation: RequestGeneration::new(),
            state,
        }
    }

    /// Stored object path this player reads.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current state.
    pub fn state(&self) -> MediaState {
        self.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<MediaState> {
        self.state.subscribe()
    }

    /// Request the signed URL and publish the outcome.
    ///
    /// Only the first call on a mounted player issues a request; later
    /// calls, and any call after unmount, return the current state. A
    /// result arriving after unmount leaves the published state untouched.
    pub async fn resolve(&self) -> MediaState {
        if !self.mounted.load(Ordering::Acquire) || self.requested.swap(true, Ordering::AcqRel) {
            return self.state();
        }
        let ticket = self.generation.begin();

        let outcome = match ObjectPath::new(self.path.as_str()) {
            Ok(path) => self
                .storage
                .create_signed_url(Bucket::Audio, &path, SIGNED_URL_TTL)
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(error.to_string()),
        };

        if !self.generation.is_current(ticket) {
            debug!(path = %self.path, "discarding stale signed url");
            return self.state();
        }

        let next = match outcome {
            Ok(url) => MediaState::Resolved(url),
            Err(message) => {
                warn!(path = %self.path, %message, "error signing audio url");
                MediaState::Failed(AUDIO_UNAVAILABLE.to_owned())
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    /// Drop any outstanding request's result and stop resolving.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
        self.generation.invalidate();
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ObjectUpload;
    use crate::domain::ports::{MockObjectStorage, StorageError};
    use async_trait::async_trait;
    use rstest::rstest;
    use tokio::sync::Notify;

    fn signed() -> Url {
        Url::parse("https://backend.test/storage/v1/object/sign/audio/a.mp3?token=t")
            .expect("valid url")
    }

    struct HeldStorage {
        release: Notify,
    }

    #[async_trait]
    impl ObjectStorage for HeldStorage {
        async fn upload(&self, _object: &ObjectUpload) -> Result<(), StorageError> {
            Ok(())
        }

        async fn remove(&self, _bucket: Bucket, _paths: &[ObjectPath]) -> Result<(), StorageError> {
            Ok(())
        }

        async fn create_signed_url(
            &self,
            _bucket: Bucket,
            _path: &ObjectPath,
            _ttl: Duration,
        ) -> Result<Url, StorageError> {
            self.release.notified().await;
            Ok(signed())
        }

        fn public_url(&self, _bucket: Bucket, _path: &ObjectPath) -> Result<Url, StorageError> {
            Err(StorageError::rejected("private bucket"))
        }
    }

    #[rstest]
    #[tokio::test]
    async fn resolves_with_five_minute_ttl() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_create_signed_url()
            .withf(|bucket, path, ttl| {
                *bucket == Bucket::Audio
                    && path.as_str() == "owner/1-a.mp3"
                    && *ttl == Duration::from_secs(300)
            })
            .times(1)
            .returning(|_, _, _| Ok(signed()));

        let media = MountedMedia::new(Arc::new(storage), "owner/1-a.mp3");
        assert_eq!(media.state(), MediaState::Resolving);

        let state = media.resolve().await;
        assert_eq!(state.url(), Some(&signed()));
    }

    #[rstest]
    #[tokio::test]
    async fn repeated_resolve_reuses_the_first_result() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_create_signed_url()
            .times(1)
            .returning(|_, _, _| Ok(signed()));
        let media = MountedMedia::new(Arc::new(storage), "owner/a.mp3");

        let first = media.resolve().await;
        let second = media.resolve().await;

        assert_eq!(first.url(), Some(&signed()));
        assert_eq!(second, first);
    }

    #[rstest]
    #[tokio::test]
    async fn unmounted_player_is_not_resolved_again() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_create_signed_url()
            .times(1)
            .returning(|_, _, _| Ok(signed()));
        let media = MountedMedia::new(Arc::new(storage), "owner/a.mp3");
        let resolved = media.resolve().await;

        media.unmount();

        assert_eq!(media.resolve().await, resolved);
    }

    #[rstest]
    #[tokio::test]
    async fn resolve_after_unmount_sends_nothing() {
        let media = MountedMedia::new(Arc::new(MockObjectStorage::new()), "owner/a.mp3");
        let updates = media.subscribe();

        media.unmount();

        assert_eq!(media.resolve().await, MediaState::Resolving);
        assert!(!updates.has_changed().expect("sender alive"));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_object_shows_audio_unavailable() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_create_signed_url()
            .returning(|_, _, _| Err(StorageError::not_found("Object not found")));

        let media = MountedMedia::new(Arc::new(storage), "owner/gone.mp3");

        assert_eq!(
            media.resolve().await,
            MediaState::Failed(AUDIO_UNAVAILABLE.to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn malformed_path_fails_without_request() {
        let storage = MockObjectStorage::new();
        let media = MountedMedia::new(Arc::new(storage), "");

        assert_eq!(
            media.resolve().await,
            MediaState::Failed(AUDIO_UNAVAILABLE.to_owned())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn result_after_unmount_is_discarded() {
        let storage = Arc::new(HeldStorage {
            release: Notify::new(),
        });
        let media = MountedMedia::new(Arc::clone(&storage), "owner/a.mp3");

        let unmount = async {
            tokio::task::yield_now().await;
            media.unmount();
            storage.release.notify_one();
        };
        let (state, ()) = tokio::join!(media.resolve(), unmount);

        assert_eq!(state, MediaState::Resolving);
        assert_eq!(media.state(), MediaState::Resolving);
    }
}
