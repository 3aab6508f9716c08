//! Public feed: genre list, newest public tracks and the genre filter.
//!
//! The two fetches are independent. Each owns a [`Remote`] slot so one can
//! fail and be retried while the other keeps its data. Filtering never
//! touches the network.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::error_mapping::map_data_store_error;
use super::ports::{GenreRepository, TrackRepository};
use super::{Genre, GenreId, Remote, RequestGeneration, TrackListing};

/// Number of tracks requested for the feed.
pub const FEED_PAGE_SIZE: usize = 50;

/// Empty-state text when the filter excludes every loaded track.
pub const NO_MATCHING_TRACKS: &str =
    "No tracks found for the selected genres. Try selecting different genres.";

/// Empty-state text when nothing has been published.
pub const NO_TRACKS_YET: &str = "No tracks available yet.";

/// Set of selected genres. Empty means "show everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreFilter {
    selected: BTreeSet<GenreId>,
}

impl GenreFilter {
    /// Filter preselecting `genres`.
    pub fn with_genres(genres: impl IntoIterator<Item = GenreId>) -> Self {
        Self {
            selected: genres.into_iter().collect(),
        }
    }

    /// Flip one genre; returns whether it is now selected.
    pub fn toggle(&mut self, genre: GenreId) -> bool {
        if self.selected.remove(&genre) {
            false
        } else {
            self.selected.insert(genre);
            true
        }
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Whether no genre is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether `genre` is selected.
    pub fn contains(&self, genre: GenreId) -> bool {
        self.selected.contains(&genre)
    }

    /// Whether `listing` passes the filter.
    ///
    /// Tracks without a genre only pass an empty filter.
    pub fn matches(&self, listing: &TrackListing) -> bool {
        self.is_empty()
            || listing
                .track
                .genre_id
                .is_some_and(|genre| self.selected.contains(&genre))
    }
}

/// Everything the feed view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Genre list, ordered by name.
    pub genres: Remote<Vec<Genre>>,
    /// Newest public tracks.
    pub tracks: Remote<Vec<TrackListing>>,
    /// Current genre selection.
    pub filter: GenreFilter,
}

impl FeedState {
    /// Tracks passing the filter, or `None` while tracks are not loaded.
    pub fn visible_tracks(&self) -> Option<Vec<&TrackListing>> {
        self.tracks.ready().map(|tracks| {
            tracks
                .iter()
                .filter(|listing| self.filter.matches(listing))
                .collect()
        })
    }

    /// Empty-state text, when tracks are loaded and none are visible.
    pub fn empty_message(&self) -> Option<&'static str> {
        let visible = self.visible_tracks()?;
        if !visible.is_empty() {
            return None;
        }
        if self.filter.is_empty() {
            Some(NO_TRACKS_YET)
        } else {
            Some(NO_MATCHING_TRACKS)
        }
    }
}

/// Drives the feed's fetches and publishes [`FeedState`] snapshots.
///
/// Each slot has its own generation counter: a response is applied only if
/// no newer fetch of the same slot started meanwhile.
pub struct FeedLoader<G: ?Sized, T: ?Sized> {
    genres: Arc<G>,
    tracks: Arc<T>,
    genre_generation: RequestGeneration,
    track_generation: RequestGeneration,
    state: watch::Sender<FeedState>,
}

impl<G, T> FeedLoader<G, T>
where
    G: GenreRepository + ?Sized,
    T: TrackRepository + ?Sized,
{
    /// Create a loader with both slots idle.
    pub fn new(genres: Arc<G>, tracks: Arc<T>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            genres,
            tracks,
            genre_generation: RequestGeneration::new(),
            track_generation: RequestGeneration::new(),
            state,
        }
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Issue both fetches concurrently.
    pub async fn load(&self) -> FeedState {
        tokio::join!(self.reload_genres(), self.reload_tracks());
        self.snapshot()
    }

    /// Re-issue only the genre fetch.
    pub async fn reload_genres(&self) {
        let ticket = self.genre_generation.begin();
        self.state
            .send_modify(|state| state.genres = Remote::Loading);
        let outcome = self.genres.list_by_name().await.map_err(|error| {
            warn!(%error, "genre fetch failed");
            map_data_store_error("Failed to load genres", error)
        });
        if !self.genre_generation.is_current(ticket) {
            debug!("discarding superseded genre fetch");
            return;
        }
        self.state
            .send_modify(|state| state.genres = Remote::from(outcome));
    }

    /// Re-issue only the track fetch.
    pub async fn reload_tracks(&self) {
        let ticket = self.track_generation.begin();
        self.state
            .send_modify(|state| state.tracks = Remote::Loading);
        let outcome = self
            .tracks
            .list_public(FEED_PAGE_SIZE)
            .await
            .map_err(|error| {
                warn!(%error, "track fetch failed");
                map_data_store_error("Failed to load tracks", error)
            });
        if !self.track_generation.is_current(ticket) {
            debug!("discarding superseded track fetch");
            return;
        }
        self.state
            .send_modify(|state| state.tracks = Remote::from(outcome));
    }

    /// Flip one genre in the filter; returns whether it is now selected.
    pub fn toggle_genre(&self, genre: GenreId) -> bool {
        let mut selected = false;
        self.state.send_modify(|state| {
            selected = state.filter.toggle(genre);
        });
        selected
    }

    /// Reset the filter to "everything".
    pub fn clear_filter(&self) {
        self.state.send_modify(|state| state.filter.clear());
    }
}
