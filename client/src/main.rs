//! Command-line front end: each subcommand is one navigable route.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use trackshare::config::ClientSettings;
use trackshare::domain::{
    Confirmation, Error, FeedLoader, FollowToggle, GateState, GenreId, GuardDecision,
    LoginCredentials, MediaState, MountedMedia, ProfileAggregator, ProfileEditor, ProfileUpdate,
    ProfileView, RelationKind, RelationList, Route, SelectedFile, SessionGate, TrackId,
    TrackListing, TrackManager, UploadForm, UserId, Visibility, display_name, guard,
};
use trackshare::outbound::BackendAdapters;

/// `trackshare` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "trackshare",
    about = "Share audio tracks, browse the public feed and follow other listeners",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out of the current session.
    Logout {
        /// Confirm without prompting.
        #[arg(long)]
        yes: bool,
    },
    /// Show the public feed, optionally filtered by genre ids.
    Feed {
        #[arg(long = "genre", value_name = "id")]
        genres: Vec<i64>,
    },
    /// Print a short-lived playback URL for a stored audio path.
    Play {
        #[arg(value_name = "audio-path")]
        path: String,
    },
    /// Show a profile; your own when `--user` is omitted.
    Profile {
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Follow a user.
    Follow { user: UserId },
    /// Stop following a user.
    Unfollow { user: UserId },
    /// List who follows a user.
    Followers {
        #[arg(long)]
        user: Option<UserId>,
    },
    /// List who a user follows.
    Following {
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Upload an audio file.
    Upload {
        #[arg(long, value_name = "path")]
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        #[arg(long, default_value = "")]
        album: String,
        #[arg(long, value_name = "id")]
        genre: Option<i64>,
        /// Hide the track from other users.
        #[arg(long)]
        private: bool,
    },
    /// List your uploaded tracks.
    Tracks,
    /// Delete one of your tracks.
    Delete {
        #[arg(value_name = "track-id")]
        track: String,
        /// Confirm without prompting.
        #[arg(long)]
        yes: bool,
    },
    /// Update your profile.
    EditProfile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Image file to use as avatar.
        #[arg(long, value_name = "path")]
        avatar: Option<PathBuf>,
    },
}

impl Command {
    fn route(&self) -> Route {
        match self {
            Self::Login { .. } => Route::Entry,
            Self::Logout { .. } | Self::Feed { .. } | Self::Play { .. } => Route::Home,
            Self::Profile { user } | Self::Followers { user } | Self::Following { user } => {
                Route::Profile { user: *user }
            }
            Self::Follow { user } | Self::Unfollow { user } => Route::Profile { user: Some(*user) },
            Self::EditProfile { .. } => Route::Profile { user: None },
            Self::Upload { .. } | Self::Tracks | Self::Delete { .. } => Route::Upload,
        }
    }
}

struct App {
    adapters: BackendAdapters,
    gate: SessionGate<trackshare::outbound::backend::HttpAuthProvider>,
    clock: Arc<DefaultClock>,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        debug!(%error, "tracing subscriber already installed");
    }

    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = ClientSettings::load_from_iter([OsString::from("trackshare")])
        .map_err(|error| io::Error::other(format!("load configuration: {error}")))?;
    let clock = Arc::new(DefaultClock);
    let adapters = BackendAdapters::connect(&settings, clock.clone())
        .map_err(|error| io::Error::other(format!("configure backend: {error}")))?;

    let mut gate = SessionGate::new(Arc::clone(&adapters.auth));
    if let Err(error) = gate.start().await {
        debug!(code = ?error.code(), "continuing without a session");
    }
    let mut app = App {
        adapters,
        gate,
        clock,
    };
    let outcome = app.run(args.command).await;
    app.gate.shutdown();
    outcome
}

impl App {
    async fn run(&self, command: Command) -> io::Result<()> {
        let state = self.gate.state();
        let route = match guard(command.route(), &state) {
            GuardDecision::Render(route) => route,
            GuardDecision::Redirect(Route::Entry) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "sign in first with `trackshare login`",
                ));
            }
            GuardDecision::Redirect(target) => {
                println!("Already signed in; continue at {target}");
                return Ok(());
            }
            GuardDecision::Placeholder => {
                return Err(io::Error::other("session is still loading"));
            }
        };
        debug!(%route, "rendering route");
        let viewer = state.viewer();

        match command {
            Command::Login { email, password } => self.login(&email, &password).await,
            Command::Logout { yes } => self.logout(yes).await,
            Command::Feed { genres } => self.feed(&state, genres).await,
            Command::Play { path } => self.play(path).await,
            Command::Profile { user } => self.profile(user, viewer).await,
            Command::Follow { user } => self.set_following(user, viewer, true).await,
            Command::Unfollow { user } => self.set_following(user, viewer, false).await,
            Command::Followers { user } => {
                self.relations(user, viewer, RelationKind::Followers).await
            }
            Command::Following { user } => {
                self.relations(user, viewer, RelationKind::Following).await
            }
            Command::Upload {
                file,
                title,
                artist,
                album,
                genre,
                private,
            } => {
                let form = UploadForm {
                    file: Some(read_selected_file(&file).await?),
                    title,
                    artist,
                    album,
                    genre: genre.map(GenreId::new),
                    visibility: if private {
                        Visibility::Private
                    } else {
                        Visibility::Public
                    },
                };
                self.upload(signed_in(viewer)?, form).await
            }
            Command::Tracks => self.tracks(signed_in(viewer)?).await,
            Command::Delete { track, yes } => self.delete(signed_in(viewer)?, &track, yes).await,
            Command::EditProfile {
                username,
                bio,
                location,
                avatar,
            } => {
                let changes = ProfileChanges {
                    username,
                    bio,
                    location,
                    avatar,
                };
                self.edit_profile(signed_in(viewer)?, changes).await
            }
        }
    }

    async fn login(&self, email: &str, password: &str) -> io::Result<()> {
        let credentials = LoginCredentials::try_from_parts(email, password)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;
        let session = self.gate.sign_in(&credentials).await.map_err(cli_error)?;
        println!("Signed in as {}", session.email().unwrap_or(email));
        Ok(())
    }

    async fn logout(&self, yes: bool) -> io::Result<()> {
        if self
            .gate
            .sign_out(Confirmation::from_answer(yes))
            .await
            .map_err(cli_error)?
        {
            println!("Signed out.");
        } else {
            println!("Sign-out cancelled; pass --yes to confirm.");
        }
        Ok(())
    }

    async fn feed(&self, state: &GateState, genres: Vec<i64>) -> io::Result<()> {
        if let Some(session) = state.session() {
            let editor = self.profile_editor();
            let profile = editor.load(*session.user_id()).await.ok();
            println!("Welcome, {}!", display_name(session, profile.as_ref()));
        }

        let data = Arc::clone(&self.adapters.data);
        let loader = FeedLoader::new(Arc::clone(&data), data);
        loader.load().await;
        for genre in genres {
            loader.toggle_genre(GenreId::new(genre));
        }
        let feed = loader.snapshot();

        if let Some(error) = feed.genres.error() {
            return Err(cli_error(error.clone()));
        }
        if let Some(genres) = feed.genres.ready() {
            let names: Vec<String> = genres
                .iter()
                .map(|genre| {
                    let marker = if feed.filter.contains(genre.id) { "*" } else { "" };
                    format!("{marker}{} ({})", genre.name, genre.id)
                })
                .collect();
            println!("Genres: {}", names.join(", "));
        }
        if let Some(error) = feed.tracks.error() {
            return Err(cli_error(error.clone()));
        }
        if let Some(message) = feed.empty_message() {
            println!("{message}");
            return Ok(());
        }
        for listing in feed.visible_tracks().unwrap_or_default() {
            print_listing(listing);
        }
        Ok(())
    }

    async fn play(&self, path: String) -> io::Result<()> {
        let media = MountedMedia::new(Arc::clone(&self.adapters.storage), path);
        let state = media.resolve().await;
        media.unmount();
        match state {
            MediaState::Resolved(url) => {
                println!("{url}");
                Ok(())
            }
            MediaState::Failed(message) => Err(io::Error::other(message)),
            MediaState::Resolving => Err(io::Error::other("playback URL still resolving")),
        }
    }

    async fn load_view(&self, user: Option<UserId>, viewer: Option<UserId>) -> io::Result<ProfileView> {
        let data = Arc::clone(&self.adapters.data);
        let aggregator = ProfileAggregator::new(Arc::clone(&data), Arc::clone(&data), data);
        aggregator.aggregate(user, viewer).await.map_err(cli_error)
    }

    async fn profile(&self, user: Option<UserId>, viewer: Option<UserId>) -> io::Result<()> {
        let view = self.load_view(user, viewer).await?;
        let profile = &view.profile;
        println!("{}", profile.display_username());
        if let Some(bio) = profile.bio.as_deref() {
            println!("{bio}");
        }
        if let Some(location) = profile.location.as_deref() {
            println!("Location: {location}");
        }
        println!(
            "Followers: {}  Following: {}",
            view.follower_count, view.following_count
        );
        if let Some(state) = view.follow_state() {
            println!(
                "{}",
                if state.following { "You follow this user." } else { "You do not follow this user." }
            );
        }
        if view.tracks.is_empty() {
            println!("No tracks uploaded yet.");
        }
        for listing in &view.tracks {
            print_listing(listing);
        }
        Ok(())
    }

    async fn set_following(
        &self,
        target: UserId,
        viewer: Option<UserId>,
        follow: bool,
    ) -> io::Result<()> {
        let viewer = signed_in(viewer)?;
        let view = self.load_view(Some(target), Some(viewer)).await?;
        let Some(current) = view.follow_state() else {
            return Err(cli_error(Error::invalid_request("You cannot follow yourself.")));
        };
        let name = view.profile.display_username();
        if current.following == follow {
            println!(
                "{} {name}.",
                if follow { "Already following" } else { "Not following" }
            );
            return Ok(());
        }
        let toggle = FollowToggle::new(Arc::clone(&self.adapters.data));
        let next = toggle
            .toggle(viewer, target, current)
            .await
            .map_err(cli_error)?;
        println!(
            "{} {name}. Followers: {}",
            if next.following { "Following" } else { "Unfollowed" },
            next.follower_count
        );
        Ok(())
    }

    async fn relations(
        &self,
        user: Option<UserId>,
        viewer: Option<UserId>,
        kind: RelationKind,
    ) -> io::Result<()> {
        let subject = user.or(viewer).ok_or_else(not_signed_in)?;
        let data = Arc::clone(&self.adapters.data);
        let list = RelationList::new(Arc::clone(&data), data);
        let entries = list.load(subject, kind, viewer).await.map_err(cli_error)?;
        println!("{} ({})", kind.title(), entries.len());
        for entry in entries {
            println!("{}  {}", entry.username, entry.route);
        }
        Ok(())
    }

    fn track_manager(
        &self,
    ) -> TrackManager<
        trackshare::outbound::backend::RestDataStore,
        trackshare::outbound::backend::HttpObjectStorage,
    > {
        TrackManager::new(
            Arc::clone(&self.adapters.data),
            Arc::clone(&self.adapters.storage),
            self.clock.clone(),
        )
    }

    fn profile_editor(
        &self,
    ) -> ProfileEditor<
        trackshare::outbound::backend::RestDataStore,
        trackshare::outbound::backend::HttpObjectStorage,
    > {
        ProfileEditor::new(
            Arc::clone(&self.adapters.data),
            Arc::clone(&self.adapters.storage),
            self.clock.clone(),
        )
    }

    async fn upload(&self, owner: UserId, form: UploadForm) -> io::Result<()> {
        let track = self
            .track_manager()
            .upload(owner, form)
            .await
            .map_err(cli_error)?;
        println!("Track uploaded successfully! ({})", track.audio_path);
        Ok(())
    }

    async fn tracks(&self, owner: UserId) -> io::Result<()> {
        let tracks = self.track_manager().list_own(owner).await.map_err(cli_error)?;
        if tracks.is_empty() {
            println!("You haven't uploaded any tracks yet.");
        }
        for listing in &tracks {
            print_listing(listing);
        }
        Ok(())
    }

    async fn delete(&self, owner: UserId, raw: &str, yes: bool) -> io::Result<()> {
        let track = TrackId::parse(raw)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;
        let deleted = self
            .track_manager()
            .delete(owner, track, Confirmation::from_answer(yes))
            .await
            .map_err(cli_error)?;
        if deleted {
            println!("Track deleted successfully!");
        } else {
            println!("Delete cancelled; pass --yes to confirm.");
        }
        Ok(())
    }

    async fn edit_profile(&self, user: UserId, changes: ProfileChanges) -> io::Result<()> {
        let editor = self.profile_editor();
        let current = editor.load(user).await.map_err(cli_error)?;
        let mut update = ProfileUpdate::from_profile(&current);
        if let Some(username) = changes.username {
            update.username = username;
        }
        if let Some(bio) = changes.bio {
            update.bio = bio;
        }
        if let Some(location) = changes.location {
            update.location = location;
        }
        if let Some(path) = changes.avatar {
            let file = read_selected_file(&path).await?;
            let url = editor.upload_avatar(user, file).await.map_err(cli_error)?;
            update.avatar_url = Some(url.to_string());
        }
        let saved = editor.save(user, update).await.map_err(cli_error)?;
        println!("Profile updated successfully! ({})", saved.display_username());
        Ok(())
    }
}

struct ProfileChanges {
    username: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    avatar: Option<PathBuf>,
}

fn print_listing(listing: &TrackListing) {
    let size = listing
        .size_kib()
        .map(|kib| format!(" | {kib} KiB"))
        .unwrap_or_default();
    println!(
        "{}  {} | {} | {} | {} | by {}{size}",
        listing.track.id,
        listing.track.title,
        listing.byline(),
        listing.genre_label(),
        listing.track.visibility.label(),
        listing.author_label(),
    );
    if let Some(path) = listing.track.audio_path.as_deref() {
        println!("    audio: {path}");
    }
}

fn not_signed_in() -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        "sign in first with `trackshare login`",
    )
}

fn signed_in(viewer: Option<UserId>) -> io::Result<UserId> {
    viewer.ok_or_else(not_signed_in)
}

fn cli_error(error: Error) -> io::Error {
    debug!(code = ?error.code(), message = error.message(), "request failed");
    match error.field() {
        Some(field) => io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{field}: {}", error.user_message()),
        ),
        None => io::Error::other(error.user_message().to_owned()),
    }
}

async fn read_selected_file(path: &Path) -> io::Result<SelectedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|error| io::Error::other(format!("read '{}': {error}", path.display())))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path must name a file"))?;
    Ok(SelectedFile {
        content_type: guess_content_type(&name).to_owned(),
        name,
        bytes,
    })
}

fn guess_content_type(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
