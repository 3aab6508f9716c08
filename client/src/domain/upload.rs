//! Upload form validation and storage path construction.
//!
//! Everything here is pure: a form that fails validation never reaches a
//! port.

use std::fmt;

use super::{Error, GenreId, ObjectPath, UserId, Visibility};

/// Largest accepted audio file.
pub const MAX_AUDIO_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted audio MIME types.
pub const ALLOWED_AUDIO_TYPES: [&str; 3] = ["audio/mpeg", "audio/wav", "audio/ogg"];

/// Accepted audio file extensions.
pub const ALLOWED_AUDIO_EXTENSIONS: [&str; 3] = [".mp3", ".wav", ".ogg"];

/// Name used when nothing of the original file name survives sanitizing.
const FALLBACK_FILE_NAME: &str = "audio";

/// A file picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Name as reported by the picker.
    pub name: String,
    /// MIME type as reported by the picker.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Size in bytes.
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Raw state of the upload form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    /// Picked file.
    pub file: Option<SelectedFile>,
    /// Track title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Album; blank means none.
    pub album: String,
    /// Selected genre.
    pub genre: Option<GenreId>,
    /// Whether other users may see the track.
    pub visibility: Visibility,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Picked file; size, type and extension already checked.
    pub file: SelectedFile,
    /// Trimmed title.
    pub title: String,
    /// Trimmed artist.
    pub artist: String,
    /// Trimmed album, when given.
    pub album: Option<String>,
    /// Selected genre.
    pub genre: GenreId,
    /// Visibility of the new track.
    pub visibility: Visibility,
}

impl UploadForm {
    /// Check the form, reporting the first problem with its field.
    ///
    /// Order: file selected, title and artist present, genre selected, then
    /// the file's size, type and extension.
    pub fn validate(self) -> Result<ValidatedUpload, Error> {
        let Some(file) = self.file else {
            return Err(Error::invalid_field(
                "file",
                "Please select an audio file to upload",
            ));
        };
        let title = self.title.trim();
        let artist = self.artist.trim();
        if title.is_empty() || artist.is_empty() {
            let field = if title.is_empty() { "title" } else { "artist" };
            return Err(Error::invalid_field(field, "Title and artist are required"));
        }
        let Some(genre) = self.genre else {
            return Err(Error::invalid_field(
                "genre",
                "Please select a genre for your track",
            ));
        };
        validate_audio_file(&file)?;

        let album = self.album.trim();
        Ok(ValidatedUpload {
            title: title.to_owned(),
            artist: artist.to_owned(),
            album: (!album.is_empty()).then(|| album.to_owned()),
            file,
            genre,
            visibility: self.visibility,
        })
    }
}

/// Check size, MIME type and extension of an audio file.
pub fn validate_audio_file(file: &SelectedFile) -> Result<(), Error> {
    if file.size() > MAX_AUDIO_BYTES {
        return Err(Error::invalid_field(
            "file",
            format!("File too large. Maximum size is {}MB.", MAX_AUDIO_BYTES / (1024 * 1024)),
        ));
    }
    if !ALLOWED_AUDIO_TYPES.contains(&file.content_type.as_str()) {
        return Err(Error::invalid_field(
            "file",
            "Invalid file type. Please upload an allowed audio format.",
        ));
    }
    let name = file.name.to_lowercase();
    if !ALLOWED_AUDIO_EXTENSIONS
        .iter()
        .any(|extension| name.ends_with(extension))
    {
        return Err(Error::invalid_field(
            "file",
            "Invalid file extension. Please upload an allowed audio format.",
        ));
    }
    Ok(())
}

/// Reduce a file name to `[a-z0-9._-]`.
///
/// # Examples
/// ```
/// use trackshare::domain::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("My Song (Final).MP3"), "mysongfinal.mp3");
/// assert_eq!(sanitize_file_name("☃"), "audio");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        FALLBACK_FILE_NAME.to_owned()
    } else {
        sanitized
    }
}

/// Storage path `<owner>/<unix millis>-<sanitized name>`.
pub fn audio_object_path(owner: UserId, unix_millis: i64, file_name: &str) -> Result<ObjectPath, Error> {
    let path = format!("{owner}/{unix_millis}-{}", sanitize_file_name(file_name));
    ObjectPath::new(path).map_err(|error| Error::internal(format!("invalid storage path: {error}")))
}
