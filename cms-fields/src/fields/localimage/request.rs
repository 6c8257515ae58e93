//! Form submission handling for local image fields

use super::{FileAction, LocalImageType, StoredFileRecord};
use crate::document::Item;
use crate::error::FieldResult;
use crate::extractors::FieldRequest;
use crate::fields::FieldPaths;

/// What a form submission did to the field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    /// Removal action applied, if the body carried one
    pub action: Option<FileAction>,
    /// Record of the uploaded file, if one was stored
    pub upload: Option<StoredFileRecord>,
}

impl RequestOutcome {
    /// Whether the submission left the field untouched
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.action.is_none() && self.upload.is_none()
    }
}

/// Deferred handling of one form submission
///
/// Nothing happens until [`RequestHandler::run`] is awaited. A `delete` or
/// `reset` action in the body runs first; an upload at the field's upload key
/// is stored afterwards, so a submission can clear the old image and store a
/// new one in one go.
pub struct RequestHandler<'a> {
    field: &'a LocalImageType,
    item: &'a mut dyn Item,
    request: &'a FieldRequest,
    paths: FieldPaths,
}

impl<'a> RequestHandler<'a> {
    pub(super) fn new(
        field: &'a LocalImageType,
        item: &'a mut dyn Item,
        request: &'a FieldRequest,
        paths: FieldPaths,
    ) -> Self {
        Self {
            field,
            item,
            request,
            paths,
        }
    }

    /// Form keys the handler reads
    #[must_use]
    pub const fn paths(&self) -> &FieldPaths {
        &self.paths
    }

    /// Applies the submission to the item
    ///
    /// # Errors
    ///
    /// Propagates errors from the removal action or from
    /// [`LocalImageType::upload_file`].
    pub async fn run(self) -> FieldResult<RequestOutcome> {
        let Self {
            field,
            item,
            request,
            paths,
        } = self;
        let mut outcome = RequestOutcome::default();

        let action = request
            .text(&paths.action)
            .and_then(|value| value.parse::<FileAction>().ok());
        if let Some(action) = action {
            field.apply(&mut *item, action)?;
            outcome.action = Some(action);
        }

        if let Some(file) = request.file(&paths.upload).filter(|file| !file.is_empty()) {
            let record = field.upload_file(&mut *item, file, true).await?;
            outcome.upload = Some(record);
        }

        tracing::debug!(
            field = %field.path,
            action = outcome.action.map(FileAction::as_str),
            uploaded = outcome.upload.is_some(),
            "Handled field request"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for RequestHandler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("field", &self.field.path)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}
