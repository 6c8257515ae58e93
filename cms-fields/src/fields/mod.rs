//! Field types
//!
//! A field type owns one path on a model: it registers the storage shape on
//! the [`Schema`], validates submitted input, reports modification, formats
//! the stored value for display and handles form submissions for that path.

pub mod localimage;

use crate::document::{Item, Schema};
use serde_json::Value;

pub use localimage::{FileAction, LocalImageType, StoredFileRecord};

/// Capability interface shared by all field types
pub trait FieldType: Send + Sync {
    /// Short type identifier (`"localimage"`)
    fn type_name(&self) -> &'static str;

    /// Path of the field on the model (`"image"`)
    fn path(&self) -> &str;

    /// Adds the field's stored paths, virtuals and item methods to `schema`
    fn register_schema(&self, schema: &mut Schema);

    /// Whether the field's value in a submitted data object is well-formed
    fn validate_input(&self, data: &Value) -> bool;

    /// Whether a required field is satisfied by `data` or by the stored value
    fn validate_required_input(&self, item: &dyn Item, data: &Value) -> bool;

    /// Whether the stored value changed since the last save
    fn is_modified(&self, item: &dyn Item) -> bool;

    /// Display value for the stored data
    fn format(&self, item: &dyn Item) -> Value;
}

/// Looks up the value submitted for `path` in a data object
///
/// Accepts both flat keys (`{"image.path": ..}`) and nested objects
/// (`{"image": {"path": ..}}`).
#[must_use]
pub fn submitted_value<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = data.get(path) {
        return Some(value);
    }
    let pointer = format!("/{}", path.replace('.', "/"));
    data.pointer(&pointer)
}

/// Dotted sub-paths and form keys derived from a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPaths {
    /// `<path>.filename`
    pub filename: String,
    /// `<path>.originalname`
    pub originalname: String,
    /// `<path>.path`
    pub path: String,
    /// `<path>.size`
    pub size: String,
    /// `<path>.width`
    pub width: String,
    /// `<path>.height`
    pub height: String,
    /// `<path>.filetype`
    pub filetype: String,
    /// `<path>.exists` (virtual)
    pub exists: String,
    /// `<path>.href` (virtual)
    pub href: String,
    /// `<path>_upload` (multipart file part)
    pub upload: String,
    /// `<path>_action` (multipart text part)
    pub action: String,
}

impl FieldPaths {
    /// Derives all paths for the field at `path`
    #[must_use]
    pub fn for_field(path: &str) -> Self {
        let sub = |name: &str| format!("{path}.{name}");
        Self {
            filename: sub("filename"),
            originalname: sub("originalname"),
            path: sub("path"),
            size: sub("size"),
            width: sub("width"),
            height: sub("height"),
            filetype: sub("filetype"),
            exists: sub("exists"),
            href: sub("href"),
            upload: format!("{path}_upload"),
            action: format!("{path}_action"),
        }
    }
}
