//! Local image field configuration

use super::hooks::{FnHook, HookChain, HookEvent, HookPhase, HookResult, MoveContext, MoveHook};
use super::naming::{Clock, SystemClock};
use super::record::FileView;
use crate::document::Item;
use crate::storage::IncomingFile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Custom stored-filename callback
pub type FilenameFn = Arc<dyn Fn(&dyn Item, &IncomingFile) -> String + Send + Sync>;

/// Custom display formatter
pub type FormatFn = Arc<dyn Fn(&dyn Item, &FileView) -> Value + Send + Sync>;

/// Serializable local image settings
///
/// These are the options that can live in a config file; callbacks and hooks
/// are attached through [`LocalImageOptions`].
///
/// # Example Configuration
///
/// ```toml
/// [fields.hero_image]
/// dest = "images/heroes"
/// dest_root = "./public"
/// allowed_types = ["image/png", "image/jpeg"]
/// date_prefix = "YYYY-MM-DD"
/// auto_cleanup = true
/// ```
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalImageSettings {
    /// Destination directory relative to `dest_root` (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    /// Root directory the destination is resolved against
    pub dest_root: PathBuf,

    /// Host the widget resolves image URLs against
    pub host: String,

    /// URL prefix used for `href` instead of the stored path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Replace existing files with the same name
    pub overwrite: bool,

    /// MIME allow-list; `None` accepts everything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_types: Option<Vec<String>>,

    /// Moment-style date pattern prepended to stored filenames
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_prefix: Option<String>,

    /// Plain "remove" deletes the file instead of only clearing the reference
    pub auto_cleanup: bool,

    /// Collapse the widget when no file is stored
    pub collapse: bool,

    /// Render the widget read-only
    pub noedit: bool,

    /// Widget label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Help note under the widget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Use the field on the initial create form (not supported)
    pub initial: bool,
}

impl Default for LocalImageSettings {
    fn default() -> Self {
        Self {
            dest: None,
            dest_root: PathBuf::new(),
            host: String::new(),
            prefix: None,
            overwrite: true,
            allowed_types: None,
            date_prefix: None,
            auto_cleanup: false,
            collapse: false,
            noedit: false,
            label: None,
            note: None,
            initial: false,
        }
    }
}

/// Full configuration for a local image field
///
/// # Examples
///
/// ```rust
/// use cms_fields::fields::localimage::LocalImageOptions;
///
/// let options = LocalImageOptions::new("images")
///     .dest_root("./public")
///     .allowed_types(["image/png", "image/jpeg"])
///     .date_prefix("YYYY-MM-DD")
///     .pre_move_fn(|ctx| {
///         if ctx.file.size > 5 * 1024 * 1024 {
///             return Err("image too large".into());
///         }
///         Ok(())
///     });
///
/// assert_eq!(options.settings.dest.as_deref(), Some("images"));
/// ```
#[derive(Clone, Default)]
pub struct LocalImageOptions {
    /// Serializable settings
    pub settings: LocalImageSettings,
    pub(crate) filename: Option<FilenameFn>,
    pub(crate) format: Option<FormatFn>,
    pub(crate) hooks: HookChain,
    pub(crate) clock: Option<Arc<dyn Clock>>,
}

impl LocalImageOptions {
    /// Creates options storing files under `dest`
    #[must_use]
    pub fn new(dest: impl Into<String>) -> Self {
        Self::from_settings(LocalImageSettings {
            dest: Some(dest.into()),
            ..LocalImageSettings::default()
        })
    }

    /// Creates options from loaded settings
    #[must_use]
    pub fn from_settings(settings: LocalImageSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Set the root directory `dest` is resolved against
    #[must_use]
    pub fn dest_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.settings.dest_root = root.into();
        self
    }

    /// Set the host image URLs are resolved against
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.settings.host = host.into();
        self
    }

    /// Set the public URL prefix used for `href`
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.prefix = Some(prefix.into());
        self
    }

    /// Set whether existing files may be replaced
    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.settings.overwrite = overwrite;
        self
    }

    /// Restrict uploads to the given MIME types
    #[must_use]
    pub fn allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.allowed_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Prefix stored filenames with the upload date
    #[must_use]
    pub fn date_prefix(mut self, pattern: impl Into<String>) -> Self {
        self.settings.date_prefix = Some(pattern.into());
        self
    }

    /// Set whether a plain remove deletes the stored file
    #[must_use]
    pub const fn auto_cleanup(mut self, enabled: bool) -> Self {
        self.settings.auto_cleanup = enabled;
        self
    }

    /// Collapse the widget when no file is stored
    #[must_use]
    pub const fn collapse(mut self, enabled: bool) -> Self {
        self.settings.collapse = enabled;
        self
    }

    /// Render the widget read-only
    #[must_use]
    pub const fn noedit(mut self, enabled: bool) -> Self {
        self.settings.noedit = enabled;
        self
    }

    /// Set the widget label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.settings.label = Some(label.into());
        self
    }

    /// Set the help note shown under the widget
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.settings.note = Some(note.into());
        self
    }

    /// Compute stored filenames with a callback
    ///
    /// Takes precedence over the date prefix.
    #[must_use]
    pub fn filename<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Item, &IncomingFile) -> String + Send + Sync + 'static,
    {
        self.filename = Some(Arc::new(f));
        self
    }

    /// Format the stored value for display with a callback
    #[must_use]
    pub fn format<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Item, &FileView) -> Value + Send + Sync + 'static,
    {
        self.format = Some(Arc::new(f));
        self
    }

    /// Add a hook run before the upload is moved
    #[must_use]
    pub fn pre_move(mut self, hook: Arc<dyn MoveHook>) -> Self {
        self.hooks.register(HookPhase::Pre, HookEvent::Move, hook);
        self
    }

    /// Add a synchronous closure run before the upload is moved
    #[must_use]
    pub fn pre_move_fn<F>(self, f: F) -> Self
    where
        F: Fn(&MoveContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.pre_move(Arc::new(FnHook(f)))
    }

    /// Add a hook run after the upload is moved and its record assembled
    #[must_use]
    pub fn post_move(mut self, hook: Arc<dyn MoveHook>) -> Self {
        self.hooks.register(HookPhase::Post, HookEvent::Move, hook);
        self
    }

    /// Add a synchronous closure run after the upload is moved
    #[must_use]
    pub fn post_move_fn<F>(self, f: F) -> Self
    where
        F: Fn(&MoveContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.post_move(Arc::new(FnHook(f)))
    }

    /// Use a specific clock for date prefixes
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub(crate) fn clock_or_system(&self) -> Arc<dyn Clock> {
        self.clock.clone().unwrap_or_else(|| Arc::new(SystemClock))
    }
}

impl fmt::Debug for LocalImageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalImageOptions")
            .field("settings", &self.settings)
            .field("filename", &self.filename.is_some())
            .field("format", &self.format.is_some())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LocalImageSettings::default();
        assert!(settings.overwrite);
        assert!(!settings.auto_cleanup);
        assert!(settings.dest.is_none());
        assert!(settings.allowed_types.is_none());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: LocalImageSettings = toml::from_str(
            r#"
            dest = "uploads"
            overwrite = false
            allowed_types = ["image/png"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.dest.as_deref(), Some("uploads"));
        assert!(!settings.overwrite);
        assert_eq!(settings.allowed_types, Some(vec!["image/png".to_string()]));
        assert_eq!(settings.host, "");
    }

    #[test]
    fn test_builder_registers_hooks() {
        let options = LocalImageOptions::new("uploads")
            .pre_move_fn(|_| Ok(()))
            .post_move_fn(|_| Ok(()))
            .post_move_fn(|_| Ok(()));

        assert_eq!(options.hooks.len(HookPhase::Pre, HookEvent::Move), 1);
        assert_eq!(options.hooks.len(HookPhase::Post, HookEvent::Move), 2);
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let options = LocalImageOptions::new("uploads").filename(|_, file| file.name.to_uppercase());
        let debug = format!("{options:?}");
        assert!(debug.contains("filename: true"));
        assert!(debug.contains("format: false"));
    }
}
