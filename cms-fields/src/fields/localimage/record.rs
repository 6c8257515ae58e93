//! Stored metadata for one uploaded image

use crate::document::Item;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata persisted on the document for an uploaded image
///
/// Either `filename` and `path` are both empty (no file) or both set and
/// pointing at `destRoot/path/filename`. The record is always written to the
/// document as one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredFileRecord {
    /// Stored file name (after prefixing or custom naming)
    pub filename: String,
    /// File name as uploaded by the browser
    pub originalname: String,
    /// Directory relative to `destRoot` (the field's `dest`)
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type
    pub filetype: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl StoredFileRecord {
    /// The cleared value written by `reset`
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the record stored at `field_path`
    ///
    /// Missing or malformed data reads as an empty record.
    #[must_use]
    pub fn from_item(item: &dyn Item, field_path: &str) -> Self {
        item.get(field_path)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Whether the record references a file
    #[must_use]
    pub fn has_file(&self) -> bool {
        !self.filename.is_empty()
    }

    /// JSON form written onto the document
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A stored record augmented with its public href, as handed to formatters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    /// Stored metadata
    #[serde(flatten)]
    pub record: StoredFileRecord,
    /// Public URL of the file
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    #[test]
    fn test_from_item_reads_partial_records() {
        let doc = Document::from_value(json!({
            "image": { "filename": "a.png", "path": "images", "size": 12 }
        }));

        let record = StoredFileRecord::from_item(&doc, "image");
        assert_eq!(record.filename, "a.png");
        assert_eq!(record.path, "images");
        assert_eq!(record.size, 12);
        assert_eq!(record.width, 0);
        assert!(record.has_file());
    }

    #[test]
    fn test_from_item_tolerates_garbage() {
        let doc = Document::from_value(json!({ "image": 42 }));
        assert_eq!(StoredFileRecord::from_item(&doc, "image"), StoredFileRecord::empty());
        assert!(!StoredFileRecord::empty().has_file());
    }

    #[test]
    fn test_file_view_flattens_record() {
        let view = FileView {
            record: StoredFileRecord {
                filename: "a.png".into(),
                path: "images".into(),
                ..StoredFileRecord::default()
            },
            href: "images/a.png".into(),
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["filename"], "a.png");
        assert_eq!(value["href"], "images/a.png");
    }
}
