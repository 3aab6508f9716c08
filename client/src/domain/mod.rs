//! Domain primitives, view state and client services.
//!
//! Purpose: model the audio-sharing client independently of the hosted
//! backend. Services depend only on the traits in [`ports`]; adapters in
//! `crate::outbound` implement those traits over HTTP.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure type returned by services.
//! - UserId, Username, Session, Profile, Track, Genre, FollowEdge: entities.
//! - Remote, GateState, MediaState, FeedState: view state read by front ends.
//! - SessionGate, FeedLoader, MountedMedia, ProfileAggregator, FollowToggle,
//!   RelationList, TrackManager, ProfileEditor: services.

pub mod auth;
pub mod confirmation;
pub mod error;
pub(crate) mod error_mapping;
pub mod feed;
pub mod follow;
pub mod follow_toggle;
pub mod generation;
pub mod media;
pub mod object;
pub mod ports;
pub mod profile;
pub mod profile_aggregator;
pub mod profile_editor;
pub mod relation_list;
pub mod remote;
pub mod route_guard;
pub mod session;
pub mod session_gate;
pub mod track;
pub mod track_manager;
pub mod upload;
pub mod user;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::confirmation::Confirmation;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::feed::{FEED_PAGE_SIZE, FeedLoader, FeedState, GenreFilter};
pub use self::follow::{FollowEdge, FollowState, RelationKind};
pub use self::follow_toggle::{FOLLOW_IN_PROGRESS, FollowToggle};
pub use self::generation::{GenerationTicket, RequestGeneration};
pub use self::media::{AUDIO_UNAVAILABLE, MediaState, MountedMedia, SIGNED_URL_TTL};
pub use self::object::{Bucket, ObjectPath, ObjectPathError, ObjectUpload};
pub use self::profile::{
    ANONYMOUS_USERNAME, Profile, ProfileRecord, ProfileSummary, display_username,
};
pub use self::profile_aggregator::{ProfileAggregator, ProfileView, Relationship};
pub use self::profile_editor::{ProfileEditor, ProfileUpdate, display_name};
pub use self::relation_list::{RelationEntry, RelationList};
pub use self::remote::Remote;
pub use self::route_guard::{GuardDecision, Route, RouteError, guard};
pub use self::session::{AccessToken, AuthEvent, Session};
pub use self::session_gate::{GateState, SessionContext, SessionGate};
pub use self::track::{
    AuthorSummary, Genre, GenreId, NewTrack, Track, TrackId, TrackListing, Visibility,
    VisibilityScope,
};
pub use self::track_manager::TrackManager;
pub use self::upload::{
    SelectedFile, UploadForm, ValidatedUpload, audio_object_path, sanitize_file_name,
};
pub use self::user::{USERNAME_MAX, USERNAME_MIN, UserId, UserValidationError, Username};
