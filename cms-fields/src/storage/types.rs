//! Core types for uploaded files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file received in a form submission, parked in a temporary location
///
/// The multipart extractor writes each file part to a temp file; the upload
/// pipeline later moves it into the field's destination directory.
///
/// # Examples
///
/// ```rust
/// use cms_fields::storage::IncomingFile;
///
/// let file = IncomingFile::new("/tmp/upload-1234", "photo.png", "image/png", 2048);
///
/// assert_eq!(file.name, "photo.png");
/// assert_eq!(file.originalname, "photo.png");
/// assert!(!file.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingFile {
    /// Temporary location of the uploaded bytes
    pub path: PathBuf,

    /// File name used to build the stored filename
    pub name: String,

    /// File name as sent by the browser
    pub originalname: String,

    /// MIME type (e.g., "image/png")
    pub mimetype: String,

    /// Size in bytes
    pub size: u64,
}

impl IncomingFile {
    /// Creates a new incoming file
    ///
    /// `name` is used both as the working name and the original name.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        mimetype: impl Into<String>,
        size: u64,
    ) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            originalname: name.clone(),
            name,
            mimetype: mimetype.into(),
            size,
        }
    }

    /// Overrides the original name reported by the browser
    #[must_use]
    pub fn with_originalname(mut self, originalname: impl Into<String>) -> Self {
        self.originalname = originalname.into();
        self
    }

    /// Whether the upload carried no bytes (an untouched file input)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Temporary location of the uploaded bytes
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.path
    }

    /// Final segment of the browser-supplied name
    ///
    /// See [`base_name`].
    #[must_use]
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// Strips any directory part from a client file name
///
/// Browsers may send a full local path (`C:\fakepath\a.png`) and a hostile
/// client may send `../../a.png`. Both separators are honoured.
///
/// # Examples
///
/// ```rust
/// use cms_fields::storage::base_name;
///
/// assert_eq!(base_name("../../etc/cat.png"), "cat.png");
/// assert_eq!(base_name(r"C:\fakepath\cat.png"), "cat.png");
/// assert_eq!(base_name("cat.png"), "cat.png");
/// ```
#[must_use]
pub fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_originalname_override() {
        let file = IncomingFile::new("/tmp/a", "a.png", "image/png", 3).with_originalname("Holiday.png");
        assert_eq!(file.name, "a.png");
        assert_eq!(file.originalname, "Holiday.png");
    }

    #[test]
    fn test_empty_upload() {
        let file = IncomingFile::new("/tmp/a", "", "application/octet-stream", 0);
        assert!(file.is_empty());
        assert_eq!(file.temp_path(), Path::new("/tmp/a"));
    }

    #[test]
    fn test_base_name_drops_directories() {
        assert_eq!(IncomingFile::new("/t", "/etc/passwd", "", 1).base_name(), "passwd");
        assert_eq!(IncomingFile::new("/t", r"..\..\x.png", "", 1).base_name(), "x.png");
        assert_eq!(base_name("dir/"), "");
        assert_eq!(base_name(".."), "..");
    }
}
