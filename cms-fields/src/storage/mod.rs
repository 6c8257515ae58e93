//! Upload storage on the local filesystem
//!
//! Field types receive uploads as [`IncomingFile`]s parked in temp files,
//! move them into place with [`LocalStorage`], and read image metadata with
//! [`ImageProcessor`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use cms_fields::storage::{ImageProcessor, IncomingFile, LocalStorage};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let storage = LocalStorage::new("/var/www/public")?;
//!
//! let upload = IncomingFile::new("/tmp/upload-1", "avatar.png", "image/png", 1024);
//! let stored_at = storage.move_into(&upload, "images", "avatar.png", true).await?;
//!
//! let dims = ImageProcessor::new().dimensions(&stored_at).await?;
//! println!("{}x{}", dims.width, dims.height);
//! # Ok(())
//! # }
//! ```

mod local;
pub mod processing;
mod types;

pub use local::LocalStorage;
pub use processing::{Dimensions, ImageProcessor};
pub use types::{base_name, IncomingFile};
