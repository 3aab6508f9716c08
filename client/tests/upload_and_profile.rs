//! Track uploads, deletions and own-profile edits over the in-memory backend.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use trackshare::domain::{
    AccessToken, Bucket, Confirmation, ErrorCode, GenreId, ProfileEditor, ProfileUpdate,
    SelectedFile, Session, TrackManager, UploadForm, UserId, Visibility, display_name,
};
use trackshare::test_support::{FixtureClock, InMemoryBackend, Operation};

const NOW_MILLIS: i64 = 1_717_234_200_000;

struct Studio {
    backend: Arc<InMemoryBackend>,
    owner: UserId,
    genre: GenreId,
}

impl Studio {
    fn clock() -> Arc<dyn Clock> {
        let now = Utc
            .timestamp_millis_opt(NOW_MILLIS)
            .single()
            .expect("valid timestamp");
        Arc::new(FixtureClock::at(now))
    }

    fn manager(&self) -> TrackManager<InMemoryBackend, InMemoryBackend> {
        TrackManager::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.backend),
            Self::clock(),
        )
    }

    fn editor(&self) -> ProfileEditor<InMemoryBackend, InMemoryBackend> {
        ProfileEditor::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.backend),
            Self::clock(),
        )
    }

    fn form(&self) -> UploadForm {
        UploadForm {
            file: Some(SelectedFile {
                name: "Night Drive (demo).MP3".to_owned(),
                content_type: "audio/mpeg".to_owned(),
                bytes: vec![7; 2048],
            }),
            title: "Night Drive".to_owned(),
            artist: "Low Tide".to_owned(),
            album: " ".to_owned(),
            genre: Some(self.genre),
            visibility: Visibility::Public,
        }
    }
}

#[fixture]
fn studio() -> Studio {
    let backend = Arc::new(InMemoryBackend::new());
    let owner = UserId::random();
    backend.add_profile(owner, "lowtide");
    let genre = backend.add_genre(4, "Ambient");
    Studio {
        backend,
        owner,
        genre,
    }
}

#[rstest]
#[tokio::test]
async fn missing_genre_is_rejected_before_any_request(studio: Studio) {
    let form = UploadForm {
        genre: None,
        ..studio.form()
    };

    let error = studio
        .manager()
        .upload(studio.owner, form)
        .await
        .expect_err("validation fails");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(error.field(), Some("genre"));
    assert_eq!(error.user_message(), "Please select a genre for your track");
    assert!(studio.backend.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn upload_stores_object_then_records_track(studio: Studio) {
    let record = studio
        .manager()
        .upload(studio.owner, studio.form())
        .await
        .expect("upload succeeds");

    let expected_path = format!("{}/{NOW_MILLIS}-nightdrivedemo.mp3", studio.owner);
    assert_eq!(record.audio_path, expected_path);
    assert_eq!(record.album, None);
    assert_eq!(record.file_size, 2048);
    assert_eq!(
        studio.backend.calls(),
        vec![Operation::UploadObject, Operation::InsertTrack]
    );
    assert_eq!(
        studio
            .backend
            .object_content_type(Bucket::Audio, &expected_path)
            .as_deref(),
        Some("audio/mpeg")
    );
    assert_eq!(
        studio.backend.object_len(Bucket::Audio, &expected_path),
        Some(2048)
    );

    let tracks = studio
        .manager()
        .list_own(studio.owner)
        .await
        .expect("listing loads");
    assert_eq!(tracks.len(), 1);
    assert_eq!(
        tracks.first().map(|listing| listing.genre_name.as_deref()),
        Some(Some("Ambient"))
    );
}

#[rstest]
#[tokio::test]
async fn failed_insert_leaves_the_object_behind(studio: Studio) {
    studio.backend.fail(Operation::InsertTrack);

    let error = studio
        .manager()
        .upload(studio.owner, studio.form())
        .await
        .expect_err("insert fails");

    assert_eq!(error.code(), ErrorCode::DataStore);
    assert_eq!(studio.backend.object_paths(Bucket::Audio).len(), 1);
    assert!(studio.backend.tracks().is_empty());
}

#[rstest]
#[tokio::test]
async fn failed_storage_upload_records_nothing(studio: Studio) {
    studio.backend.fail(Operation::UploadObject);

    let error = studio
        .manager()
        .upload(studio.owner, studio.form())
        .await
        .expect_err("upload fails");

    assert_eq!(error.code(), ErrorCode::Storage);
    assert_eq!(studio.backend.call_count(Operation::InsertTrack), 0);
}

#[rstest]
#[tokio::test]
async fn declined_delete_sends_nothing(studio: Studio) {
    let track = studio
        .backend
        .add_track(studio.owner, "keep me", None, Visibility::Public);

    let deleted = studio
        .manager()
        .delete(studio.owner, track, Confirmation::Declined)
        .await
        .expect("declining is not an error");

    assert!(!deleted);
    assert!(studio.backend.calls().is_empty());
    assert_eq!(studio.backend.tracks().len(), 1);
}

#[rstest]
#[tokio::test]
async fn confirmed_delete_removes_record_and_audio(studio: Studio) {
    let record = studio
        .manager()
        .upload(studio.owner, studio.form())
        .await
        .expect("upload succeeds");
    let track = studio
        .backend
        .tracks()
        .first()
        .map(|track| track.id)
        .expect("track recorded");

    let deleted = studio
        .manager()
        .delete(studio.owner, track, Confirmation::Confirmed)
        .await
        .expect("delete succeeds");

    assert!(deleted);
    assert!(studio.backend.tracks().is_empty());
    assert!(!studio.backend.has_object(Bucket::Audio, &record.audio_path));
}

#[rstest]
#[tokio::test]
async fn storage_failure_during_delete_is_swallowed(studio: Studio) {
    let record = studio
        .manager()
        .upload(studio.owner, studio.form())
        .await
        .expect("upload succeeds");
    let track = studio
        .backend
        .tracks()
        .first()
        .map(|track| track.id)
        .expect("track recorded");
    studio.backend.fail(Operation::RemoveObjects);

    let deleted = studio
        .manager()
        .delete(studio.owner, track, Confirmation::Confirmed)
        .await
        .expect("record removal is enough");

    assert!(deleted);
    assert!(studio.backend.tracks().is_empty());
    assert!(studio.backend.has_object(Bucket::Audio, &record.audio_path));
}

#[rstest]
#[tokio::test]
async fn deleting_someone_elses_track_is_not_found(studio: Studio) {
    let stranger = UserId::random();
    let track = studio
        .backend
        .add_track(stranger, "theirs", None, Visibility::Public);

    let error = studio
        .manager()
        .delete(studio.owner, track, Confirmation::Confirmed)
        .await
        .expect_err("not owned");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(studio.backend.call_count(Operation::DeleteTrack), 0);
}

#[rstest]
#[tokio::test]
async fn saved_profile_reloads_with_trimmed_fields(studio: Studio) {
    let editor = studio.editor();
    let update = ProfileUpdate {
        username: "  lowtide_music ".to_owned(),
        bio: "Tape loops and field recordings".to_owned(),
        location: "   ".to_owned(),
        avatar_url: None,
    };

    editor
        .save(studio.owner, update)
        .await
        .expect("save succeeds");
    let loaded = editor.load(studio.owner).await.expect("load succeeds");

    assert_eq!(loaded.username.as_deref(), Some("lowtide_music"));
    assert_eq!(
        loaded.bio.as_deref(),
        Some("Tape loops and field recordings")
    );
    assert_eq!(loaded.location, None);
}

#[rstest]
#[tokio::test]
async fn invalid_username_is_reported_on_its_field(studio: Studio) {
    let update = ProfileUpdate {
        username: "x".to_owned(),
        ..ProfileUpdate::default()
    };

    let error = studio
        .editor()
        .save(studio.owner, update)
        .await
        .expect_err("too short");

    assert_eq!(error.field(), Some("username"));
    assert_eq!(studio.backend.call_count(Operation::UpsertProfile), 0);
}

#[rstest]
#[tokio::test]
async fn avatar_upload_returns_public_url(studio: Studio) {
    let file = SelectedFile {
        name: "Me At The Beach.PNG".to_owned(),
        content_type: "image/png".to_owned(),
        bytes: vec![1; 16],
    };

    let url = studio
        .editor()
        .upload_avatar(studio.owner, file)
        .await
        .expect("avatar stored");

    let path = format!("{}/meatthebeach.png", studio.owner);
    assert!(url.as_str().ends_with(&format!("/public/avatars/{path}")));
    assert!(studio.backend.has_object(Bucket::Avatars, &path));
}

#[rstest]
#[case(Some("lowtide"), Some("ada@example.com"), "lowtide")]
#[case(Some("  "), Some("ada@example.com"), "ada@example.com")]
#[case(None, None, "user")]
fn greeting_prefers_username_then_email(
    #[case] username: Option<&str>,
    #[case] email: Option<&str>,
    #[case] expected: &str,
) {
    let user = UserId::random();
    let session = Session::new(
        user,
        email.map(str::to_owned),
        AccessToken::new("token"),
    );
    let profile = trackshare::domain::Profile {
        username: username.map(str::to_owned),
        ..trackshare::domain::Profile::empty(user)
    };

    assert_eq!(display_name(&session, Some(&profile)), expected);
}
