//! Document and schema seams
//!
//! Field types never talk to a database. They read and write values on an
//! [`Item`] using dotted paths (`"image.filename"`) and describe their storage
//! shape to a [`Schema`]. [`Document`] is the in-memory implementation used by
//! the admin layer and by tests; an ORM adapter implements [`Item`] directly.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A model instance whose values are addressed by dotted path
pub trait Item: Send + Sync {
    /// Returns the value stored at `path`, if any
    fn get(&self, path: &str) -> Option<&Value>;

    /// Replaces the value stored at `path`
    ///
    /// Setting an object replaces the whole sub-document in one step.
    fn set(&mut self, path: &str, value: Value);

    /// Whether `path` (or anything below or above it) changed since the last save
    fn is_modified(&self, path: &str) -> bool;

    /// Returns the string at `path`, or `""` when absent or not a string
    fn get_str(&self, path: &str) -> &str {
        self.get(path).and_then(Value::as_str).unwrap_or_default()
    }
}

/// In-memory JSON document with modified-path tracking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    values: Map<String, Value>,
    modified: BTreeSet<String>,
}

impl Document {
    /// Creates an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document from a JSON object, treating it as freshly loaded
    ///
    /// Non-object values produce an empty document.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self {
                values,
                modified: BTreeSet::new(),
            },
            _ => Self::default(),
        }
    }

    /// Returns the document contents as JSON
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Paths changed since the document was loaded or last marked saved
    pub fn modified_paths(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(String::as_str)
    }

    /// Clears modification tracking, as after a successful save
    pub fn mark_saved(&mut self) {
        self.modified.clear();
    }
}

impl Item for Document {
    fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.values.get(first)?, |value, key| value.get(key))
    }

    fn set(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut target = &mut self.values;
        for key in segments {
            let entry = target
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            target = next;
        }

        target.insert(last.to_string(), value);
        self.modified.insert(path.to_string());
    }

    fn is_modified(&self, path: &str) -> bool {
        self.modified.iter().any(|changed| {
            changed == path
                || path
                    .strip_prefix(changed.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
                || changed
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Storage type of a schema path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    /// String value
    String,
    /// Numeric value
    Number,
}

/// Computes a derived value from an item
pub type VirtualFn = Arc<dyn Fn(&dyn Item) -> Value + Send + Sync>;

/// Collects the stored paths, virtuals and per-item methods fields register
#[derive(Clone, Default)]
pub struct Schema {
    paths: BTreeMap<String, SchemaType>,
    virtuals: BTreeMap<String, VirtualFn>,
    methods: BTreeMap<String, Vec<String>>,
}

impl Schema {
    /// Creates an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stored path
    pub fn add(&mut self, path: impl Into<String>, kind: SchemaType) {
        self.paths.insert(path.into(), kind);
    }

    /// Adds a derived, non-stored path computed by `resolve`
    pub fn add_virtual<F>(&mut self, path: impl Into<String>, resolve: F)
    where
        F: Fn(&dyn Item) -> Value + Send + Sync + 'static,
    {
        self.virtuals.insert(path.into(), Arc::new(resolve));
    }

    /// Registers the item methods a field exposes (`image.reset()`, ...)
    pub fn add_methods<I, S>(&mut self, field_path: impl Into<String>, methods: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods
            .entry(field_path.into())
            .or_default()
            .extend(methods.into_iter().map(Into::into));
    }

    /// Storage type of a stored path
    #[must_use]
    pub fn path_type(&self, path: &str) -> Option<SchemaType> {
        self.paths.get(path).copied()
    }

    /// Whether `path` is registered as a virtual
    #[must_use]
    pub fn is_virtual(&self, path: &str) -> bool {
        self.virtuals.contains_key(path)
    }

    /// Computes the virtual `path` for `item`
    ///
    /// Returns `None` when `path` is not a registered virtual.
    #[must_use]
    pub fn resolve_virtual(&self, item: &dyn Item, path: &str) -> Option<Value> {
        self.virtuals.get(path).map(|resolve| resolve(item))
    }

    /// Reads `path` from `item`, computing it when it is a virtual
    #[must_use]
    pub fn value(&self, item: &dyn Item, path: &str) -> Option<Value> {
        self.resolve_virtual(item, path)
            .or_else(|| item.get(path).cloned())
    }

    /// Item methods registered for a field
    #[must_use]
    pub fn methods(&self, field_path: &str) -> &[String] {
        self.methods
            .get(field_path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All stored paths in lexical order
    pub fn paths(&self) -> impl Iterator<Item = (&str, SchemaType)> {
        self.paths.iter().map(|(path, kind)| (path.as_str(), *kind))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("paths", &self.paths)
            .field("virtuals", &self.virtuals.keys().collect::<Vec<_>>())
            .field("methods", &self.methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_get_and_set() {
        let mut doc = Document::new();
        doc.set("image", json!({ "filename": "a.png", "path": "images" }));

        assert_eq!(doc.get_str("image.filename"), "a.png");
        assert_eq!(doc.get("image.path"), Some(&json!("images")));
        assert!(doc.get("image.size").is_none());
        assert_eq!(doc.get_str("missing.path"), "");
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut doc = Document::new();
        doc.set("image.path", json!("uploads"));
        assert_eq!(doc.to_value(), json!({ "image": { "path": "uploads" } }));
    }

    #[test]
    fn test_modified_tracking_covers_parents_and_children() {
        let mut doc = Document::from_value(json!({ "image": { "path": "" } }));
        assert!(!doc.is_modified("image.path"));

        doc.set("image", json!({ "path": "uploads" }));
        assert!(doc.is_modified("image.path"));
        assert!(doc.is_modified("image"));
        assert!(!doc.is_modified("imageAlt"));

        doc.mark_saved();
        assert!(!doc.is_modified("image.path"));

        doc.set("image.path", json!("other"));
        assert!(doc.is_modified("image"));
        assert_eq!(doc.modified_paths().collect::<Vec<_>>(), vec!["image.path"]);
    }

    #[test]
    fn test_schema_registration() {
        let mut schema = Schema::new();
        schema.add("image.size", SchemaType::Number);
        schema.add_virtual("image.href", |item| json!(format!("/media/{}", item.get_str("image.filename"))));
        schema.add_methods("image", ["reset", "delete"]);

        assert_eq!(schema.path_type("image.size"), Some(SchemaType::Number));
        assert!(schema.is_virtual("image.href"));
        assert!(!schema.is_virtual("image.size"));

        let doc = Document::from_value(json!({ "image": { "filename": "a.png", "size": 3 } }));
        assert_eq!(schema.value(&doc, "image.href"), Some(json!("/media/a.png")));
        assert_eq!(schema.value(&doc, "image.size"), Some(json!(3)));
        assert_eq!(schema.resolve_virtual(&doc, "image.size"), None);
        assert_eq!(schema.methods("image"), ["reset", "delete"]);
        assert!(schema.methods("other").is_empty());
    }
}
