//! Local filesystem storage for field uploads

use super::types::IncomingFile;
use crate::error::{FieldError, FieldResult, ValidationError};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage rooted at a field's `destRoot`
///
/// Stored files live at `root/<dir>/<filename>`, where `<dir>` is the field's
/// `dest` option and is also what gets persisted as the record's `path`.
///
/// # Directory Structure
///
/// ```text
/// /var/www/public/          <- root (destRoot)
/// └── images/               <- dir  (dest, stored as `path`)
///     ├── 2024-01-05-a.png  <- filename
///     └── b.jpg
/// ```
///
/// An empty root resolves relative to the process working directory.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    /// Base directory for stored files
    root: PathBuf,
}

impl LocalStorage {
    /// Creates a storage rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `root` exists and is not a directory.
    pub fn new(root: impl Into<PathBuf>) -> FieldResult<Self> {
        let root = root.into();
        // Validate root path (synchronous check is OK for initialization)
        if root.exists() && !root.is_dir() {
            return Err(FieldError::Configuration(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Base directory for stored files
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of `filename` stored under `dir`
    #[must_use]
    pub fn resolve(&self, dir: &str, filename: &str) -> PathBuf {
        self.root.join(dir).join(filename)
    }

    /// Resolves `filename` under `dir`, refusing anything but a plain name
    fn checked_target(&self, dir: &str, filename: &str) -> FieldResult<PathBuf> {
        if !is_plain_file_name(filename) {
            return Err(ValidationError::InvalidInput(format!("Invalid filename: {filename:?}")).into());
        }
        Ok(self.resolve(dir, filename))
    }

    /// Moves an uploaded temp file to `root/dir/filename`
    ///
    /// Parent directories are created as needed. With `overwrite` disabled an
    /// existing target makes the move fail; otherwise it is replaced. The move
    /// is a rename, falling back to copy-and-remove across filesystems. The
    /// no-overwrite move links or creates the target exclusively, so a file
    /// that appears concurrently is never replaced.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidInput`] if `filename` is not a single plain
    ///   path component (`""`, `..`, `a/b` and absolute paths are refused).
    /// - [`FieldError::Filesystem`] if the target exists and may not be
    ///   replaced, or if any filesystem operation fails.
    pub async fn move_into(
        &self,
        file: &IncomingFile,
        dir: &str,
        filename: &str,
        overwrite: bool,
    ) -> FieldResult<PathBuf> {
        let target = self.checked_target(dir, filename)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FieldError::filesystem("create directory", parent, e))?;
        }

        if overwrite {
            replace(file.temp_path(), &target).await?;
        } else {
            place_new(file.temp_path(), &target).await?;
        }

        tracing::debug!(
            from = %file.temp_path().display(),
            to = %target.display(),
            overwrite,
            "Moved upload into place"
        );
        Ok(target)
    }

    /// Whether `root/dir/filename` exists
    ///
    /// This is a blocking `stat`; keep it off hot request paths. Names that
    /// are not plain file names never exist.
    #[must_use]
    pub fn exists(&self, dir: &str, filename: &str) -> bool {
        self.checked_target(dir, filename)
            .is_ok_and(|target| target.is_file())
    }

    /// Removes `root/dir/filename` (blocking)
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] for a filename that is not a
    /// plain name, or [`FieldError::Filesystem`] if the file cannot be removed.
    pub fn remove(&self, dir: &str, filename: &str) -> FieldResult<()> {
        let target = self.checked_target(dir, filename)?;
        std::fs::remove_file(&target).map_err(|e| FieldError::filesystem("delete", &target, e))?;
        tracing::debug!(path = %target.display(), "Removed stored file");
        Ok(())
    }
}

/// Whether `name` is exactly one normal path component
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    !name.contains(['/', '\\'])
        && matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
}

/// Rename over any existing target
async fn replace(from: &Path, target: &Path) -> FieldResult<()> {
    match fs::rename(from, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, target)
                .await
                .map_err(|e| FieldError::filesystem("move", target, e))?;
            fs::remove_file(from)
                .await
                .map_err(|e| FieldError::filesystem("remove", from, e))
        }
        Err(e) => Err(FieldError::filesystem("move", target, e)),
    }
}

/// Place `from` at `target` only if nothing is there yet
async fn place_new(from: &Path, target: &Path) -> FieldResult<()> {
    let placed = match fs::hard_link(from, target).await {
        Err(e) if matches!(e.kind(), io::ErrorKind::CrossesDevices | io::ErrorKind::Unsupported) => {
            copy_new(from, target).await
        }
        other => other,
    };

    match placed {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(FieldError::filesystem(
                "move",
                target,
                io::Error::new(io::ErrorKind::AlreadyExists, "dest already exists."),
            ));
        }
        Err(e) => return Err(FieldError::filesystem("move", target, e)),
    }

    fs::remove_file(from)
        .await
        .map_err(|e| FieldError::filesystem("remove", from, e))
}

/// Copies `from` into a target that must not exist yet
async fn copy_new(from: &Path, target: &Path) -> io::Result<()> {
    let mut source = fs::File::open(from).await?;
    let mut dest = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await?;

    let copied = match tokio::io::copy(&mut source, &mut dest).await {
        Ok(_) => dest.flush().await,
        Err(e) => Err(e),
    };
    if copied.is_err() {
        drop(dest);
        if let Err(e) = fs::remove_file(target).await {
            tracing::warn!(path = %target.display(), error = %e, "Failed to remove partial copy");
        }
    }
    copied
}
