//! Axum extractors for field submissions
//!
//! Provides the multipart extractor that turns an edit-form submission into
//! the text parts and parked files field handlers consume.

mod field_request;

pub use field_request::{FieldRequest, FieldRequestError};
