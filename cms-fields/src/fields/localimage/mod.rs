//! Local image field type
//!
//! Stores uploaded images on the local filesystem under `destRoot/dest` and
//! keeps their metadata on the document as a single [`StoredFileRecord`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use cms_fields::document::Document;
//! use cms_fields::fields::localimage::{LocalImageOptions, LocalImageType};
//! use cms_fields::storage::IncomingFile;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let field = LocalImageType::new(
//!     "Post",
//!     "image",
//!     LocalImageOptions::new("images")
//!         .dest_root("./public")
//!         .allowed_types(["image/png", "image/jpeg"]),
//! )?;
//!
//! let mut post = Document::new();
//! let upload = IncomingFile::new("/tmp/upload-1", "cat.png", "image/png", 2048);
//! let record = field.upload_file(&mut post, &upload, true).await?;
//!
//! assert_eq!(field.href(&post), format!("images/{}", record.filename));
//! # Ok(())
//! # }
//! ```

mod hooks;
mod naming;
mod options;
mod record;
mod request;

pub use hooks::{FnHook, HookChain, HookEvent, HookPhase, HookResult, MoveContext, MoveHook};
pub use naming::{format_moment, prefixed_filename, Clock, FixedClock, SystemClock};
pub use options::{FilenameFn, FormatFn, LocalImageOptions, LocalImageSettings};
pub use record::{FileView, StoredFileRecord};
pub use request::{RequestHandler, RequestOutcome};

use super::{submitted_value, FieldPaths, FieldType};
use crate::document::{Item, Schema, SchemaType};
use crate::error::{FieldError, FieldResult, ValidationError};
use crate::storage::{ImageProcessor, IncomingFile, LocalStorage};
use crate::widget::{LocalImageWidget, WidgetProps};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Item methods exposed on documents carrying a local image field
pub const ITEM_METHODS: [&str; 5] = ["format", "uploadFile", "exists", "reset", "delete"];

/// Removal requested through the `<path>_action` form part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Remove the stored file from disk, then clear the record
    Delete,
    /// Clear the record and leave the file on disk
    Reset,
}

impl FileAction {
    /// Wire value of the action
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete" => Ok(Self::Delete),
            "reset" => Ok(Self::Reset),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown file action: {other}"
            ))),
        }
    }
}

/// Server side of a local image field
pub struct LocalImageType {
    list: String,
    path: String,
    dest: String,
    paths: FieldPaths,
    options: LocalImageOptions,
    storage: LocalStorage,
    processor: ImageProcessor,
}

impl LocalImageType {
    /// Creates the field `path` on the list `list`
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Configuration`] when `dest` is missing or empty,
    /// when the field is marked `initial`, or when `dest_root` is not a
    /// directory.
    pub fn new(list: impl Into<String>, path: impl Into<String>, options: LocalImageOptions) -> FieldResult<Self> {
        let list = list.into();
        let path = path.into();

        if options.settings.initial {
            return Err(FieldError::Configuration(format!(
                "localimage fields ({list}.{path}) do not currently support being used as initial fields."
            )));
        }

        let dest = match options.settings.dest.as_deref() {
            Some(dest) if !dest.is_empty() => dest.to_string(),
            _ => {
                return Err(FieldError::Configuration(format!(
                    "localimage fields ({list}.{path}) require the \"dest\" option to be set."
                )))
            }
        };

        let storage = LocalStorage::new(options.settings.dest_root.clone())?;

        tracing::debug!(
            list = %list,
            field = %path,
            dest = %dest,
            root = %storage.root().display(),
            "Registered localimage field"
        );

        Ok(Self {
            paths: FieldPaths::for_field(&path),
            list,
            path,
            dest,
            options,
            storage,
            processor: ImageProcessor::new(),
        })
    }

    /// Key of the list the field belongs to
    #[must_use]
    pub fn list(&self) -> &str {
        &self.list
    }

    /// Destination directory relative to `dest_root`
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Field configuration
    #[must_use]
    pub const fn options(&self) -> &LocalImageOptions {
        &self.options
    }

    /// Sub-paths and form keys of the field
    #[must_use]
    pub const fn paths(&self) -> &FieldPaths {
        &self.paths
    }

    /// Stored record of the field on `item`
    #[must_use]
    pub fn record(&self, item: &dyn Item) -> StoredFileRecord {
        StoredFileRecord::from_item(item, &self.path)
    }

    /// Whether the stored file is present on disk
    ///
    /// Performs a blocking `stat` against `destRoot/path/filename`.
    #[must_use]
    pub fn exists(&self, item: &dyn Item) -> bool {
        stored_file_exists(&self.storage, &self.record(item))
    }

    /// Public URL of the stored file, `""` when there is none
    #[must_use]
    pub fn href(&self, item: &dyn Item) -> String {
        self.href_for(&self.record(item))
    }

    fn href_for(&self, record: &StoredFileRecord) -> String {
        href_of(self.options.settings.prefix.as_deref(), record)
    }

    /// Clears the stored record
    pub fn reset(&self, item: &mut dyn Item) {
        item.set(&self.path, StoredFileRecord::empty().to_value());
    }

    /// Removes the stored file from disk if present, then clears the record
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Filesystem`] if the file exists but cannot be
    /// removed. The record is left untouched in that case.
    pub fn delete(&self, item: &mut dyn Item) -> FieldResult<()> {
        if self.exists(item) {
            let record = self.record(item);
            self.storage.remove(&record.path, &record.filename)?;
            tracing::info!(
                list = %self.list,
                field = %self.path,
                filename = %record.filename,
                "Deleted stored image"
            );
        }
        self.reset(item);
        Ok(())
    }

    /// Runs a removal action
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::delete`].
    pub fn apply(&self, item: &mut dyn Item, action: FileAction) -> FieldResult<()> {
        match action {
            FileAction::Delete => self.delete(item),
            FileAction::Reset => {
                self.reset(item);
                Ok(())
            }
        }
    }

    /// Moves an uploaded file into place and builds its record
    ///
    /// With `update` set the record is written onto `item` before the
    /// `post:move` hooks run. A failing `post:move` hook is returned as an
    /// error but nothing is rolled back: the file stays at its destination
    /// and the written record stays on `item`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::UnsupportedFileType`] when the MIME type is not
    ///   allowed. Nothing else happens in that case.
    /// - [`FieldError::Hook`] when a `pre:move` hook fails (no disk
    ///   mutation) or a `post:move` hook fails.
    /// - [`FieldError::ImageMetadata`] when the upload is not a readable
    ///   image. Dimensions are read before the move, so the destination and
    ///   `item` are untouched.
    /// - [`ValidationError::InvalidInput`] when the final filename is not a
    ///   plain file name. Directory parts of the browser-supplied name are
    ///   dropped before the date prefix is applied.
    /// - [`FieldError::Filesystem`] when the move fails.
    pub async fn upload_file(
        &self,
        item: &mut dyn Item,
        file: &IncomingFile,
        update: bool,
    ) -> FieldResult<StoredFileRecord> {
        let settings = &self.options.settings;
        let now = self.options.clock_or_system().now();
        let candidate = prefixed_filename(settings.date_prefix.as_deref(), &now, file.base_name());

        if let Some(allowed) = &settings.allowed_types {
            if !allowed.iter().any(|mime| *mime == file.mimetype) {
                tracing::warn!(
                    list = %self.list,
                    field = %self.path,
                    mimetype = %file.mimetype,
                    "Rejected upload with unsupported file type"
                );
                return Err(ValidationError::UnsupportedFileType(file.mimetype.clone()).into());
            }
        }

        let pre = MoveContext {
            item: &*item,
            file,
            record: None,
        };
        self.options
            .hooks
            .run(HookPhase::Pre, HookEvent::Move, &pre)
            .await
            .map_err(FieldError::Hook)?;

        // Inspect the parked copy so a bad upload never replaces a stored file
        let dimensions = self.processor.dimensions(file.temp_path()).await?;

        let filename = match &self.options.filename {
            Some(custom) => custom(&*item, file),
            None => candidate,
        };

        self.storage
            .move_into(file, &self.dest, &filename, settings.overwrite)
            .await?;

        let record = StoredFileRecord {
            filename,
            originalname: file.originalname.clone(),
            path: self.dest.clone(),
            size: file.size,
            filetype: file.mimetype.clone(),
            width: dimensions.width,
            height: dimensions.height,
        };

        if update {
            item.set(&self.path, record.to_value());
        }

        let post = MoveContext {
            item: &*item,
            file,
            record: Some(&record),
        };
        self.options
            .hooks
            .run(HookPhase::Post, HookEvent::Move, &post)
            .await
            .map_err(FieldError::Hook)?;

        tracing::info!(
            list = %self.list,
            field = %self.path,
            filename = %record.filename,
            size = record.size,
            width = record.width,
            height = record.height,
            "Stored uploaded image"
        );
        Ok(record)
    }

    /// Builds the handler for one form submission
    ///
    /// `paths` overrides the form keys; the field's own paths are used
    /// otherwise.
    #[must_use]
    pub fn request_handler<'a>(
        &'a self,
        item: &'a mut dyn Item,
        request: &'a crate::extractors::FieldRequest,
        paths: Option<&FieldPaths>,
    ) -> RequestHandler<'a> {
        RequestHandler::new(self, item, request, paths.cloned().unwrap_or_else(|| self.paths.clone()))
    }

    /// Handles one form submission immediately
    ///
    /// # Errors
    ///
    /// Propagates errors from the removal action or the upload.
    pub async fn handle_request(
        &self,
        item: &mut dyn Item,
        request: &crate::extractors::FieldRequest,
        paths: Option<&FieldPaths>,
    ) -> FieldResult<RequestOutcome> {
        self.request_handler(item, request, paths).run().await
    }

    /// Edit widget for the field's current value on `item`
    #[must_use]
    pub fn widget(&self, item: &dyn Item) -> LocalImageWidget {
        let settings = &self.options.settings;
        let record = self.record(item);
        let url = self.href_for(&record);

        LocalImageWidget::new(WidgetProps {
            path: self.path.clone(),
            label: settings.label.clone().unwrap_or_else(|| self.path.clone()),
            note: settings.note.clone(),
            host: settings.host.clone(),
            auto_cleanup: settings.auto_cleanup,
            collapse: settings.collapse,
            noedit: settings.noedit,
            url,
            record,
            paths: self.paths.clone(),
        })
    }
}

impl FieldType for LocalImageType {
    fn type_name(&self) -> &'static str {
        "localimage"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn register_schema(&self, schema: &mut Schema) {
        let paths = &self.paths;
        for path in [&paths.filename, &paths.originalname, &paths.path, &paths.filetype] {
            schema.add(path.as_str(), SchemaType::String);
        }
        for path in [&paths.size, &paths.width, &paths.height] {
            schema.add(path.as_str(), SchemaType::Number);
        }

        let storage = self.storage.clone();
        let field = self.path.clone();
        schema.add_virtual(paths.exists.as_str(), move |item| {
            Value::Bool(stored_file_exists(&storage, &StoredFileRecord::from_item(item, &field)))
        });

        let prefix = self.options.settings.prefix.clone();
        let field = self.path.clone();
        schema.add_virtual(paths.href.as_str(), move |item| {
            Value::String(href_of(prefix.as_deref(), &StoredFileRecord::from_item(item, &field)))
        });

        schema.add_methods(self.path.as_str(), ITEM_METHODS);
    }

    fn validate_input(&self, data: &Value) -> bool {
        match submitted_value(data, &self.path) {
            None | Some(Value::Null | Value::String(_)) => true,
            Some(Value::Object(object)) => object.contains_key("path"),
            Some(_) => false,
        }
    }

    fn validate_required_input(&self, item: &dyn Item, data: &Value) -> bool {
        let submitted = match submitted_value(data, &self.path) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        submitted
            || data.get(&self.paths.upload).is_some_and(|v| !v.is_null())
            || !item.get_str(&self.paths.path).is_empty()
    }

    fn is_modified(&self, item: &dyn Item) -> bool {
        item.is_modified(&self.paths.path)
    }

    fn format(&self, item: &dyn Item) -> Value {
        let record = self.record(item);
        if !record.has_file() {
            return Value::String(String::new());
        }
        let href = self.href_for(&record);
        match &self.options.format {
            Some(format) => format(item, &FileView { record, href }),
            None => Value::String(href),
        }
    }
}

fn stored_file_exists(storage: &LocalStorage, record: &StoredFileRecord) -> bool {
    !record.path.is_empty() && !record.filename.is_empty() && storage.exists(&record.path, &record.filename)
}

fn href_of(prefix: Option<&str>, record: &StoredFileRecord) -> String {
    if record.filename.is_empty() {
        return String::new();
    }
    let prefix = prefix.unwrap_or(&record.path);
    format!("{prefix}/{}", record.filename)
}

impl fmt::Debug for LocalImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalImageType")
            .field("list", &self.list)
            .field("path", &self.path)
            .field("dest", &self.dest)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;
    use tempfile::TempDir;

    fn field(temp: &TempDir, options: LocalImageOptions) -> LocalImageType {
        LocalImageType::new("Post", "image", options.dest_root(temp.path())).unwrap()
    }

    fn stored(filename: &str, path: &str) -> Document {
        Document::from_value(json!({
            "image": { "filename": filename, "path": path, "size": 10, "width": 2, "height": 3 }
        }))
    }

    #[test]
    fn test_missing_dest_is_configuration_error() {
        let result = LocalImageType::new("Post", "image", LocalImageOptions::default());
        let err = result.unwrap_err();
        assert!(matches!(err, FieldError::Configuration(_)));
        assert!(err.to_string().contains("(Post.image) require the \"dest\" option"));

        let empty = LocalImageType::new("Post", "image", LocalImageOptions::new(""));
        assert!(matches!(empty, Err(FieldError::Configuration(_))));
    }

    #[test]
    fn test_initial_is_rejected() {
        let mut options = LocalImageOptions::new("images");
        options.settings.initial = true;
        let err = LocalImageType::new("Post", "image", options).unwrap_err();
        assert!(err.to_string().contains("initial fields"));
    }

    #[test]
    fn test_file_action_parsing() {
        assert_eq!("delete".parse::<FileAction>().unwrap(), FileAction::Delete);
        assert_eq!("reset".parse::<FileAction>().unwrap(), FileAction::Reset);
        assert!("".parse::<FileAction>().is_err());
        assert!("delete ".parse::<FileAction>().is_err());
        assert!("RESET".parse::<FileAction>().is_err());
        assert_eq!(FileAction::Delete.to_string(), "delete");
    }

    #[test]
    fn test_href() {
        let temp = TempDir::new().unwrap();
        let plain = field(&temp, LocalImageOptions::new("images"));
        assert_eq!(plain.href(&stored("a.png", "images")), "images/a.png");
        assert_eq!(plain.href(&Document::new()), "");

        let prefixed = field(&temp, LocalImageOptions::new("images").prefix("/media"));
        assert_eq!(prefixed.href(&stored("a.png", "images")), "/media/a.png");
    }

    #[test]
    fn test_exists_checks_disk() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));
        let doc = stored("a.png", "images");
        assert!(!field.exists(&doc));

        std::fs::create_dir_all(temp.path().join("images")).unwrap();
        std::fs::write(temp.path().join("images/a.png"), b"x").unwrap();
        assert!(field.exists(&doc));
        assert!(!field.exists(&stored("", "images")));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));
        let mut doc = stored("a.png", "images");

        field.reset(&mut doc);
        let first = field.record(&doc);
        field.reset(&mut doc);
        assert_eq!(field.record(&doc), first);
        assert_eq!(first, StoredFileRecord::empty());
        assert!(field.is_modified(&doc));
    }

    #[test]
    fn test_delete_removes_file() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));
        std::fs::create_dir_all(temp.path().join("images")).unwrap();
        std::fs::write(temp.path().join("images/a.png"), b"x").unwrap();
        let mut doc = stored("a.png", "images");

        field.apply(&mut doc, FileAction::Delete).unwrap();

        assert!(!temp.path().join("images/a.png").exists());
        assert_eq!(field.record(&doc), StoredFileRecord::empty());
    }

    #[test]
    fn test_reset_keeps_file() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));
        std::fs::create_dir_all(temp.path().join("images")).unwrap();
        std::fs::write(temp.path().join("images/a.png"), b"x").unwrap();
        let mut doc = stored("a.png", "images");

        field.apply(&mut doc, FileAction::Reset).unwrap();

        assert!(temp.path().join("images/a.png").exists());
        assert!(!field.record(&doc).has_file());
    }

    #[test]
    fn test_register_schema() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));
        let mut schema = Schema::new();
        field.register_schema(&mut schema);

        assert_eq!(schema.path_type("image.filename"), Some(SchemaType::String));
        assert_eq!(schema.path_type("image.filetype"), Some(SchemaType::String));
        assert_eq!(schema.path_type("image.width"), Some(SchemaType::Number));
        assert!(schema.is_virtual("image.exists"));
        assert!(schema.is_virtual("image.href"));
        assert_eq!(schema.methods("image"), ITEM_METHODS.map(String::from).as_slice());
        assert_eq!(schema.paths().count(), 7);
    }

    #[test]
    fn test_schema_resolves_derived_values() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images").prefix("/media"));
        let mut schema = Schema::new();
        field.register_schema(&mut schema);
        let doc = stored("a.png", "images");

        assert_eq!(schema.value(&doc, "image.href"), Some(json!("/media/a.png")));
        assert_eq!(schema.value(&doc, "image.exists"), Some(json!(false)));

        std::fs::create_dir_all(temp.path().join("images")).unwrap();
        std::fs::write(temp.path().join("images/a.png"), b"x").unwrap();
        assert_eq!(schema.value(&doc, "image.exists"), Some(json!(true)));

        let empty = Document::new();
        assert_eq!(schema.value(&empty, "image.href"), Some(json!("")));
        assert_eq!(schema.value(&empty, "image.exists"), Some(json!(false)));
        assert_eq!(schema.value(&doc, "image.filename"), Some(json!("a.png")));
    }

    #[test]
    fn test_validate_input() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));

        assert!(field.validate_input(&json!({})));
        assert!(field.validate_input(&json!({ "image": null })));
        assert!(field.validate_input(&json!({ "image": "images/a.png" })));
        assert!(field.validate_input(&json!({ "image": { "path": "images" } })));
        assert!(!field.validate_input(&json!({ "image": { "filename": "a.png" } })));
        assert!(!field.validate_input(&json!({ "image": 42 })));
        assert!(!field.validate_input(&json!({ "image": ["a.png"] })));
    }

    #[test]
    fn test_validate_required_input() {
        let temp = TempDir::new().unwrap();
        let field = field(&temp, LocalImageOptions::new("images"));
        let empty = Document::new();

        assert!(!field.validate_required_input(&empty, &json!({})));
        assert!(!field.validate_required_input(&empty, &json!({ "image": "" })));
        assert!(field.validate_required_input(&empty, &json!({ "image": { "path": "x" } })));
        assert!(field.validate_required_input(&empty, &json!({ "image_upload": "a.png" })));
        assert!(field.validate_required_input(&stored("a.png", "images"), &json!({})));
    }

    #[test]
    fn test_format() {
        let temp = TempDir::new().unwrap();
        let plain = field(&temp, LocalImageOptions::new("images"));
        assert_eq!(plain.format(&Document::new()), json!(""));
        assert_eq!(plain.format(&stored("a.png", "images")), json!("images/a.png"));

        let custom = field(
            &temp,
            LocalImageOptions::new("images")
                .format(|_, view| json!(format!("{} ({}x{})", view.href, view.record.width, view.record.height))),
        );
        assert_eq!(custom.format(&stored("a.png", "images")), json!("images/a.png (2x3)"));
    }

    #[test]
    fn test_widget_props() {
        let temp = TempDir::new().unwrap();
        let field = field(
            &temp,
            LocalImageOptions::new("images").host("https://cdn.example.com").auto_cleanup(true),
        );
        let widget = field.widget(&stored("a.png", "images"));
        let props = widget.props();

        assert_eq!(props.url, "images/a.png");
        assert_eq!(props.label, "image");
        assert!(props.auto_cleanup);
        assert!(widget.has_existing());
    }
}
