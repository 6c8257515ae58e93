//! cms-fields: local image field type for content-management admin forms
//!
//! Application authors declare a local image field on a model and get:
//! - schema registration, input validation and an upload pipeline that moves
//!   files into place, reads their dimensions and records them on the document
//!   ([`fields::LocalImageType`]);
//! - pre/post `move` hooks to veto or react to uploads;
//! - delete/reset of the stored file;
//! - an edit-form widget holding the pending upload or removal
//!   ([`widget::LocalImageWidget`]).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cms_fields::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     observability::init()?;
//!
//!     let image = LocalImageType::new(
//!         "Post",
//!         "image",
//!         LocalImageOptions::new("images")
//!             .dest_root("./public")
//!             .allowed_types(["image/png", "image/jpeg"])
//!             .pre_move_fn(|ctx| {
//!                 tracing::info!(file = %ctx.file.name, "Uploading");
//!                 Ok(())
//!             }),
//!     )?;
//!
//!     let mut schema = Schema::new();
//!     image.register_schema(&mut schema);
//!
//!     let mut post = Document::new();
//!     let upload = IncomingFile::new("/tmp/upload-1", "cat.png", "image/png", 2048);
//!     image.upload_file(&mut post, &upload, true).await?;
//!
//!     println!("{}", image.widget(&post).render());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod extractors;
pub mod fields;
pub mod observability;
pub mod storage;
pub mod widget;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use cms_fields::prelude::*;
    //! ```

    pub use crate::config::{FieldsConfig, UploadsConfig};
    pub use crate::document::{Document, Item, Schema, SchemaType};
    pub use crate::error::{FieldError, FieldResult, ValidationError};
    pub use crate::extractors::{FieldRequest, FieldRequestError};
    pub use crate::fields::localimage::{
        FileView, HookEvent, HookPhase, LocalImageOptions, LocalImageSettings, MoveContext, MoveHook,
        RequestOutcome,
    };
    pub use crate::fields::{FieldPaths, FieldType, FileAction, LocalImageType, StoredFileRecord};
    pub use crate::observability;
    pub use crate::storage::IncomingFile;
    pub use crate::widget::{LocalImageWidget, PendingState, WidgetEvent, WidgetProps};

    pub use async_trait::async_trait;
    pub use serde_json::json;
}
