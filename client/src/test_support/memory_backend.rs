//! In-memory implementation of every data and storage port.
//!
//! Behaves like the hosted backend closely enough for scenario tests:
//! tracks are joined with author and genre on read, follow edges are unique
//! per pair, and signed URLs are only issued for stored objects. Every port
//! call is recorded so tests can assert which requests a flow issued.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use url::Url;

use crate::domain::ports::{
    DataStoreError, FollowRepository, GenreRepository, ObjectStorage, ProfileRepository,
    StorageError, TrackRepository,
};
use crate::domain::{
    AuthorSummary, Bucket, FollowEdge, Genre, GenreId, NewTrack, ObjectPath, ObjectUpload, Profile,
    ProfileRecord, ProfileSummary, RelationKind, Track, TrackId, TrackListing, UserId,
    Visibility, VisibilityScope,
};

const MEMORY_BASE: &str = "https://memory.test/storage/v1/object/";

/// Port operations recorded by [`InMemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `TrackRepository::list_public`.
    ListPublicTracks,
    /// `TrackRepository::list_by_owner`.
    ListOwnerTracks,
    /// `TrackRepository::find_owned`.
    FindOwnedTrack,
    /// `TrackRepository::insert`.
    InsertTrack,
    /// `TrackRepository::delete`.
    DeleteTrack,
    /// `GenreRepository::list_by_name`.
    ListGenres,
    /// `ProfileRepository::find_by_id`.
    FindProfile,
    /// `ProfileRepository::find_summaries`.
    FindSummaries,
    /// `ProfileRepository::upsert`.
    UpsertProfile,
    /// `FollowRepository::count`.
    CountFollows,
    /// `FollowRepository::exists`.
    FollowExists,
    /// `FollowRepository::insert`.
    InsertFollow,
    /// `FollowRepository::delete`.
    DeleteFollow,
    /// `FollowRepository::list_counterparts`.
    ListCounterparts,
    /// `ObjectStorage::upload`.
    UploadObject,
    /// `ObjectStorage::remove`.
    RemoveObjects,
    /// `ObjectStorage::create_signed_url`.
    SignUrl,
}

impl Operation {
    const fn is_storage(self) -> bool {
        matches!(self, Self::UploadObject | Self::RemoveObjects | Self::SignUrl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct BackendState {
    profiles: HashMap<UserId, Profile>,
    genres: Vec<Genre>,
    tracks: Vec<Track>,
    follows: Vec<FollowEdge>,
    objects: HashMap<(Bucket, String), StoredObject>,
    calls: Vec<Operation>,
    failing: HashSet<Operation>,
    inserted: i64,
}

/// Shared in-memory store for tracks, genres, profiles, follows and objects.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_default()
}

impl InMemoryBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `operation` and fail it when injected.
    fn enter(&self, operation: Operation) -> Result<MutexGuard<'_, BackendState>, String> {
        let mut state = self.lock();
        state.calls.push(operation);
        if state.failing.contains(&operation) {
            return Err(format!("injected {operation:?} failure"));
        }
        Ok(state)
    }

    fn enter_data(
        &self,
        operation: Operation,
    ) -> Result<MutexGuard<'_, BackendState>, DataStoreError> {
        debug_assert!(!operation.is_storage());
        self.enter(operation).map_err(DataStoreError::query)
    }

    fn enter_storage(
        &self,
        operation: Operation,
    ) -> Result<MutexGuard<'_, BackendState>, StorageError> {
        self.enter(operation).map_err(StorageError::transport)
    }

    /// Make every later `operation` call fail.
    pub fn fail(&self, operation: Operation) {
        self.lock().failing.insert(operation);
    }

    /// Stop failing `operation`.
    pub fn heal(&self, operation: Operation) {
        self.lock().failing.remove(&operation);
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    /// How often `operation` was called.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Add a genre.
    pub fn add_genre(&self, id: i64, name: &str) -> GenreId {
        let genre_id = GenreId::new(id);
        self.lock().genres.push(Genre {
            id: genre_id,
            name: name.to_owned(),
            description: None,
        });
        genre_id
    }

    /// Add or replace a profile row.
    pub fn add_profile(&self, id: UserId, username: &str) {
        let profile = Profile {
            username: Some(username.to_owned()),
            ..Profile::empty(id)
        };
        self.lock().profiles.insert(id, profile);
    }

    /// Stored profile, bypassing the call log.
    pub fn profile(&self, id: UserId) -> Option<Profile> {
        self.lock().profiles.get(&id).cloned()
    }

    /// Seed a track as if uploaded earlier; later seeds are newer.
    pub fn add_track(
        &self,
        owner: UserId,
        title: &str,
        genre_id: Option<GenreId>,
        visibility: Visibility,
    ) -> TrackId {
        let mut state = self.lock();
        let id = TrackId::random();
        let created_at = next_timestamp(&mut state);
        state.tracks.push(Track {
            id,
            owner,
            title: title.to_owned(),
            artist: "Fixture Artist".to_owned(),
            album: None,
            genre_id,
            audio_path: Some(format!("{owner}/{}-{title}.mp3", created_at.timestamp_millis())),
            image_path: None,
            visibility,
            mime_type: Some("audio/mpeg".to_owned()),
            file_size: Some(1024),
            created_at,
        });
        id
    }

    /// Stored tracks, bypassing the call log.
    pub fn tracks(&self) -> Vec<Track> {
        self.lock().tracks.clone()
    }

    /// Add a follow edge directly.
    pub fn add_follow(&self, follower: UserId, followed: UserId) {
        let edge = FollowEdge::new(follower, followed);
        let mut state = self.lock();
        if !state.follows.contains(&edge) {
            state.follows.push(edge);
        }
    }

    /// Whether an edge is stored, bypassing the call log.
    pub fn has_follow(&self, follower: UserId, followed: UserId) -> bool {
        self.lock()
            .follows
            .contains(&FollowEdge::new(follower, followed))
    }

    /// Store an object directly.
    pub fn put_object(&self, bucket: Bucket, path: &str, bytes: &[u8]) {
        self.lock().objects.insert(
            (bucket, path.to_owned()),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: "application/octet-stream".to_owned(),
            },
        );
    }

    /// Whether an object exists at `path`.
    pub fn has_object(&self, bucket: Bucket, path: &str) -> bool {
        self.lock().objects.contains_key(&(bucket, path.to_owned()))
    }

    /// Content type an object was stored with.
    pub fn object_content_type(&self, bucket: Bucket, path: &str) -> Option<String> {
        self.lock()
            .objects
            .get(&(bucket, path.to_owned()))
            .map(|object| object.content_type.clone())
    }

    /// Size in bytes of a stored object.
    pub fn object_len(&self, bucket: Bucket, path: &str) -> Option<usize> {
        self.lock()
            .objects
            .get(&(bucket, path.to_owned()))
            .map(|object| object.bytes.len())
    }

    /// Paths stored in `bucket`, sorted.
    pub fn object_paths(&self, bucket: Bucket) -> Vec<String> {
        let mut paths: Vec<String> = self
            .lock()
            .objects
            .keys()
            .filter(|(stored, _)| *stored == bucket)
            .map(|(_, path)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

fn next_timestamp(state: &mut BackendState) -> DateTime<Utc> {
    state.inserted += 1;
    epoch() + TimeDelta::seconds(state.inserted)
}

fn listing(state: &BackendState, track: &Track) -> TrackListing {
    let author = state.profiles.get(&track.owner).map(|profile| AuthorSummary {
        username: profile.username.clone(),
        avatar_url: profile.avatar_url.clone(),
    });
    let genre_name = track.genre_id.and_then(|id| {
        state
            .genres
            .iter()
            .find(|genre| genre.id == id)
            .map(|genre| genre.name.clone())
    });
    TrackListing {
        track: track.clone(),
        author,
        genre_name,
    }
}

fn newest_first<'a>(tracks: impl Iterator<Item = &'a Track>) -> Vec<&'a Track> {
    let mut sorted: Vec<&Track> = tracks.collect();
    sorted.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    sorted
}

fn object_url(kind: &str, bucket: Bucket, path: &ObjectPath) -> Result<Url, StorageError> {
    Url::parse(&format!("{MEMORY_BASE}{kind}/{bucket}/{path}"))
        .map_err(|error| StorageError::decode(error.to_string()))
}

#[async_trait]
impl TrackRepository for InMemoryBackend {
    async fn list_public(&self, limit: usize) -> Result<Vec<TrackListing>, DataStoreError> {
        let state = self.enter_data(Operation::ListPublicTracks)?;
        Ok(
            newest_first(state.tracks.iter().filter(|track| track.visibility.is_public()))
                .into_iter()
                .take(limit)
                .map(|track| listing(&state, track))
                .collect(),
        )
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        scope: VisibilityScope,
    ) -> Result<Vec<TrackListing>, DataStoreError> {
        let state = self.enter_data(Operation::ListOwnerTracks)?;
        let owned = state.tracks.iter().filter(|track| {
            track.owner == *owner
                && (scope == VisibilityScope::All || track.visibility.is_public())
        });
        Ok(newest_first(owned)
            .into_iter()
            .map(|track| listing(&state, track))
            .collect())
    }

    async fn find_owned(
        &self,
        id: &TrackId,
        owner: &UserId,
    ) -> Result<Option<Track>, DataStoreError> {
        let state = self.enter_data(Operation::FindOwnedTrack)?;
        Ok(state
            .tracks
            .iter()
            .find(|track| track.id == *id && track.owner == *owner)
            .cloned())
    }

    async fn insert(&self, track: &NewTrack) -> Result<(), DataStoreError> {
        let mut state = self.enter_data(Operation::InsertTrack)?;
        let created_at = next_timestamp(&mut state);
        state.tracks.push(Track {
            id: TrackId::random(),
            owner: track.owner,
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            genre_id: Some(track.genre_id),
            audio_path: Some(track.audio_path.clone()),
            image_path: None,
            visibility: track.visibility,
            mime_type: Some(track.mime_type.clone()),
            file_size: Some(track.file_size),
            created_at,
        });
        Ok(())
    }

    async fn delete(&self, id: &TrackId, owner: &UserId) -> Result<(), DataStoreError> {
        let mut state = self.enter_data(Operation::DeleteTrack)?;
        state
            .tracks
            .retain(|track| !(track.id == *id && track.owner == *owner));
        Ok(())
    }
}

#[async_trait]
impl GenreRepository for InMemoryBackend {
    async fn list_by_name(&self) -> Result<Vec<Genre>, DataStoreError> {
        let state = self.enter_data(Operation::ListGenres)?;
        let mut genres = state.genres.clone();
        genres.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(genres)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, DataStoreError> {
        let state = self.enter_data(Operation::FindProfile)?;
        Ok(state.profiles.get(id).cloned())
    }

    async fn find_summaries(&self, ids: &[UserId]) -> Result<Vec<ProfileSummary>, DataStoreError> {
        let state = self.enter_data(Operation::FindSummaries)?;
        // Reverse order mimics a backend that ignores the requested order.
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| state.profiles.get(id))
            .map(|profile| ProfileSummary {
                id: profile.id,
                username: profile.username.clone(),
                avatar_url: profile.avatar_url.clone(),
            })
            .collect())
    }

    async fn upsert(&self, record: &ProfileRecord) -> Result<(), DataStoreError> {
        let mut state = self.enter_data(Operation::UpsertProfile)?;
        state
            .profiles
            .insert(record.id, Profile::from(record.clone()));
        Ok(())
    }
}

#[async_trait]
impl FollowRepository for InMemoryBackend {
    async fn count(&self, subject: &UserId, kind: RelationKind) -> Result<u64, DataStoreError> {
        let state = self.enter_data(Operation::CountFollows)?;
        let count = state
            .follows
            .iter()
            .filter(|edge| match kind {
                RelationKind::Followers => edge.followed == *subject,
                RelationKind::Following => edge.follower == *subject,
            })
            .count();
        u64::try_from(count).map_err(|error| DataStoreError::decode(error.to_string()))
    }

    async fn exists(&self, edge: &FollowEdge) -> Result<bool, DataStoreError> {
        let state = self.enter_data(Operation::FollowExists)?;
        Ok(state.follows.contains(edge))
    }

    async fn insert(&self, edge: &FollowEdge) -> Result<(), DataStoreError> {
        let mut state = self.enter_data(Operation::InsertFollow)?;
        if state.follows.contains(edge) {
            return Err(DataStoreError::already_exists(
                "duplicate key value violates unique constraint \"followers_pkey\"",
            ));
        }
        state.follows.push(*edge);
        Ok(())
    }

    async fn delete(&self, edge: &FollowEdge) -> Result<(), DataStoreError> {
        let mut state = self.enter_data(Operation::DeleteFollow)?;
        state.follows.retain(|stored| stored != edge);
        Ok(())
    }

    async fn list_counterparts(
        &self,
        subject: &UserId,
        kind: RelationKind,
    ) -> Result<Vec<UserId>, DataStoreError> {
        let state = self.enter_data(Operation::ListCounterparts)?;
        Ok(state
            .follows
            .iter()
            .filter_map(|edge| match kind {
                RelationKind::Followers => (edge.followed == *subject).then_some(edge.follower),
                RelationKind::Following => (edge.follower == *subject).then_some(edge.followed),
            })
            .collect())
    }
}

#[async_trait]
impl ObjectStorage for InMemoryBackend {
    async fn upload(&self, object: &ObjectUpload) -> Result<(), StorageError> {
        let mut state = self.enter_storage(Operation::UploadObject)?;
        let key = (object.bucket, object.path.as_str().to_owned());
        if !object.overwrite && state.objects.contains_key(&key) {
            return Err(StorageError::rejected("The resource already exists"));
        }
        state.objects.insert(
            key,
            StoredObject {
                bytes: object.bytes.clone(),
                content_type: object.content_type.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, bucket: Bucket, paths: &[ObjectPath]) -> Result<(), StorageError> {
        let mut state = self.enter_storage(Operation::RemoveObjects)?;
        for path in paths {
            state.objects.remove(&(bucket, path.as_str().to_owned()));
        }
        Ok(())
    }

    async fn create_signed_url(
        &self,
        bucket: Bucket,
        path: &ObjectPath,
        ttl: Duration,
    ) -> Result<Url, StorageError> {
        let state = self.enter_storage(Operation::SignUrl)?;
        if !state.objects.contains_key(&(bucket, path.as_str().to_owned())) {
            return Err(StorageError::not_found("Object not found"));
        }
        let mut url = object_url("sign", bucket, path)?;
        url.query_pairs_mut()
            .append_pair("token", &format!("ttl-{}", ttl.as_secs()));
        Ok(url)
    }

    fn public_url(&self, bucket: Bucket, path: &ObjectPath) -> Result<Url, StorageError> {
        object_url("public", bucket, path)
    }
}
