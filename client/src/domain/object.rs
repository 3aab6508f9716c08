//! Object storage addressing.

use std::fmt;

/// Storage bucket used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Private bucket holding uploaded audio; read through signed URLs.
    Audio,
    /// Public bucket holding profile avatars.
    Avatars,
}

impl Bucket {
    /// Bucket name on the storage service.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Avatars => "avatars",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for [`ObjectPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectPathError {
    /// Path was empty.
    #[error("object path must not be empty")]
    Empty,
    /// Path started or ended with `/`, or contained an empty segment.
    #[error("object path must not contain empty segments")]
    EmptySegment,
    /// Path contained a `.` or `..` segment.
    #[error("object path must not contain relative segments")]
    RelativeSegment,
}

/// `/`-separated key of an object inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Validate a path.
    ///
    /// # Examples
    /// ```
    /// use trackshare::domain::ObjectPath;
    ///
    /// assert!(ObjectPath::new("owner/1700000000000-song.mp3").is_ok());
    /// assert!(ObjectPath::new("/leading").is_err());
    /// assert!(ObjectPath::new("a/../b").is_err());
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, ObjectPathError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ObjectPathError::Empty);
        }
        for segment in raw.split('/') {
            if segment.is_empty() {
                return Err(ObjectPathError::EmptySegment);
            }
            if segment == "." || segment == ".." {
                return Err(ObjectPathError::RelativeSegment);
            }
        }
        Ok(Self(raw))
    }

    /// Path segments, for URL building.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Borrow the path.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Bytes to store at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    /// Target bucket.
    pub bucket: Bucket,
    /// Target path.
    pub path: ObjectPath,
    /// Payload.
    pub bytes: Vec<u8>,
    /// `Content-Type` recorded with the object.
    pub content_type: String,
    /// Replace an existing object at the same path.
    pub overwrite: bool,
}
