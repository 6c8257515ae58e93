//! Edit-form widget for local image fields
//!
//! The widget holds at most one pending change for the next form submission:
//! a newly chosen local file or a queued removal of the stored one. It never
//! talks to the server itself; it only arms the `<path>_upload` and
//! `<path>_action` inputs the surrounding form submits.
//!
//! # Examples
//!
//! ```rust
//! use cms_fields::fields::FieldPaths;
//! use cms_fields::fields::localimage::StoredFileRecord;
//! use cms_fields::widget::{LocalImageWidget, PendingState, WidgetEvent, WidgetProps};
//!
//! let record = StoredFileRecord {
//!     filename: "a.png".into(),
//!     path: "images".into(),
//!     ..StoredFileRecord::default()
//! };
//! let mut widget = LocalImageWidget::new(WidgetProps::new("image", record));
//!
//! widget.dispatch(WidgetEvent::RemoveClicked { modifier: false });
//! assert_eq!(widget.pending_action().map(|a| a.as_str()), Some("reset"));
//!
//! widget.dispatch(WidgetEvent::UndoRemove);
//! assert_eq!(widget.state(), &PendingState::Clean);
//! ```

mod render;

use crate::fields::localimage::{FileAction, StoredFileRecord};
use crate::fields::FieldPaths;

pub use render::WidgetRenderer;

/// Pending change held by a widget instance
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingState {
    /// Nothing to submit
    #[default]
    Clean,
    /// A local file was chosen and will be uploaded on save
    LocalSelected {
        /// Preview source for the chosen file (object or data URL)
        source: String,
    },
    /// The stored file will be removed on save
    RemovalQueued {
        /// How the server should remove it
        action: FileAction,
    },
}

/// User interaction with the widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// A file was picked in the native chooser
    FileChosen {
        /// Value of the file input (`C:\fakepath\photo.png` in most browsers)
        input_value: String,
        /// Preview source for the chosen file
        preview: String,
    },
    /// The remove button was clicked, optionally with the modifier key held
    RemoveClicked {
        /// Whether the modifier key (alt) was held
        modifier: bool,
    },
    /// "Cancel Upload" was clicked
    CancelUpload,
    /// "Undo Remove" was clicked
    UndoRemove,
    /// The collapsed placeholder was clicked
    Expand,
}

/// Removal queued by a remove click
///
/// With `auto_cleanup` a plain click deletes the file and the modifier only
/// clears the reference; without it the polarity is reversed.
#[must_use]
pub const fn removal_action(auto_cleanup: bool, modifier: bool) -> FileAction {
    if auto_cleanup != modifier {
        FileAction::Delete
    } else {
        FileAction::Reset
    }
}

/// Render-time snapshot the widget is built from
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetProps {
    /// Field path on the model
    pub path: String,
    /// Display label
    pub label: String,
    /// Help note under the controls
    pub note: Option<String>,
    /// Host stored image URLs are resolved against
    pub host: String,
    /// Plain remove deletes instead of resetting
    pub auto_cleanup: bool,
    /// Collapse to a placeholder while no file is stored
    pub collapse: bool,
    /// Read-only rendering
    pub noedit: bool,
    /// Public URL of the stored file (`""` when none)
    pub url: String,
    /// Stored record (read-only snapshot)
    pub record: StoredFileRecord,
    /// Form keys of the field
    pub paths: FieldPaths,
}

impl WidgetProps {
    /// Props with default settings for the field at `path`
    ///
    /// The URL is derived from the record's `path` and `filename`.
    #[must_use]
    pub fn new(path: impl Into<String>, record: StoredFileRecord) -> Self {
        let path = path.into();
        let url = if record.filename.is_empty() {
            String::new()
        } else {
            format!("{}/{}", record.path, record.filename)
        };
        Self {
            paths: FieldPaths::for_field(&path),
            label: path.clone(),
            path,
            note: None,
            host: String::new(),
            auto_cleanup: false,
            collapse: false,
            noedit: false,
            url,
            record,
        }
    }
}

/// Label and behaviour of the clear button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearButton {
    /// Reverts a queued removal
    UndoRemove,
    /// Discards the chosen local file
    CancelUpload,
    /// Queues removal of the stored file
    Remove {
        /// Label says "Delete" rather than "Remove"
        auto_cleanup: bool,
    },
}

impl ClearButton {
    /// Button text
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UndoRemove => "Undo Remove",
            Self::CancelUpload => "Cancel Upload",
            Self::Remove { auto_cleanup: true } => "Delete File",
            Self::Remove { auto_cleanup: false } => "Remove File",
        }
    }

    /// Event dispatched when the button is clicked
    #[must_use]
    pub const fn event(self, modifier: bool) -> WidgetEvent {
        match self {
            Self::UndoRemove => WidgetEvent::UndoRemove,
            Self::CancelUpload => WidgetEvent::CancelUpload,
            Self::Remove { .. } => WidgetEvent::RemoveClicked { modifier },
        }
    }
}

/// Client-side state of one local image field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImageWidget {
    props: WidgetProps,
    state: PendingState,
    input_value: String,
    expanded: bool,
}

impl LocalImageWidget {
    /// Creates a clean widget over `props`
    #[must_use]
    pub const fn new(props: WidgetProps) -> Self {
        Self {
            props,
            state: PendingState::Clean,
            input_value: String::new(),
            expanded: false,
        }
    }

    /// Render-time snapshot
    #[must_use]
    pub const fn props(&self) -> &WidgetProps {
        &self.props
    }

    /// Current pending change
    #[must_use]
    pub const fn state(&self) -> &PendingState {
        &self.state
    }

    /// Whether the server record references a file
    #[must_use]
    pub fn has_existing(&self) -> bool {
        self.props.record.has_file()
    }

    /// Whether a local file is queued for upload
    #[must_use]
    pub const fn has_local(&self) -> bool {
        matches!(self.state, PendingState::LocalSelected { .. })
    }

    /// Whether there is any file to show, stored or local
    #[must_use]
    pub fn has_file(&self) -> bool {
        self.has_existing() || self.has_local()
    }

    /// Whether removal of the stored file is queued
    #[must_use]
    pub const fn removal_queued(&self) -> bool {
        matches!(self.state, PendingState::RemovalQueued { .. })
    }

    /// Value the `<path>_action` input submits
    #[must_use]
    pub const fn pending_action(&self) -> Option<FileAction> {
        match self.state {
            PendingState::RemovalQueued { action } => Some(action),
            _ => None,
        }
    }

    /// Current value of the native file input
    #[must_use]
    pub fn input_value(&self) -> &str {
        &self.input_value
    }

    /// Name of the chosen local file, without the browser's fake path
    #[must_use]
    pub fn local_filename(&self) -> &str {
        self.input_value
            .rsplit('\\')
            .next()
            .unwrap_or_default()
    }

    /// Whether only the collapsed placeholder is shown
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.props.collapse && !self.expanded && !self.has_file()
    }

    /// Applies a user interaction
    ///
    /// Events that make no sense in the current state are ignored. Choosing a
    /// file always wins over a queued removal.
    pub fn dispatch(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::FileChosen { input_value, preview } => {
                self.input_value = input_value;
                self.state = PendingState::LocalSelected { source: preview };
            }
            WidgetEvent::RemoveClicked { modifier } => {
                if self.state == PendingState::Clean && self.has_existing() {
                    self.state = PendingState::RemovalQueued {
                        action: removal_action(self.props.auto_cleanup, modifier),
                    };
                }
            }
            WidgetEvent::CancelUpload => {
                if self.has_local() {
                    self.input_value.clear();
                    self.state = PendingState::Clean;
                }
            }
            WidgetEvent::UndoRemove => {
                if self.removal_queued() {
                    self.input_value.clear();
                    self.state = PendingState::Clean;
                }
            }
            WidgetEvent::Expand => self.expanded = true,
        }
    }

    /// Status banner for the pending change
    #[must_use]
    pub const fn banner(&self) -> Option<&'static str> {
        match self.state {
            PendingState::Clean => None,
            PendingState::LocalSelected { .. } => Some("File selected - save to upload"),
            PendingState::RemovalQueued { .. } => Some(if self.props.auto_cleanup {
                "File deleted - save to confirm"
            } else {
                "File removed - save to confirm"
            }),
        }
    }

    /// Label of the upload button
    #[must_use]
    pub fn upload_label(&self) -> &'static str {
        if self.has_file() {
            "Change Image"
        } else {
            "Upload Image"
        }
    }

    /// Clear button, shown only while there is a file
    #[must_use]
    pub fn clear_button(&self) -> Option<ClearButton> {
        match self.state {
            PendingState::RemovalQueued { .. } => Some(ClearButton::UndoRemove),
            PendingState::LocalSelected { .. } => Some(ClearButton::CancelUpload),
            PendingState::Clean if self.has_existing() => Some(ClearButton::Remove {
                auto_cleanup: self.props.auto_cleanup,
            }),
            PendingState::Clean => None,
        }
    }

    /// Absolute URL of the stored image, resolved against the host
    #[must_use]
    pub fn stored_source(&self) -> Option<String> {
        if !self.has_existing() {
            return None;
        }
        Some(resolve_url(&self.props.host, &self.props.url))
    }

    /// Image the preview region shows, if any
    #[must_use]
    pub fn preview_source(&self) -> Option<String> {
        match &self.state {
            PendingState::LocalSelected { source } => Some(source.clone()),
            PendingState::RemovalQueued { .. } => None,
            PendingState::Clean => self.stored_source(),
        }
    }

    /// Renders the widget to HTML
    #[must_use]
    pub fn render(&self) -> String {
        WidgetRenderer::render(self)
    }
}

/// Resolves `url` against `host`
///
/// An empty host or an absolute `url` leaves `url` unchanged.
fn resolve_url(host: &str, url: &str) -> String {
    if host.is_empty() {
        return url.to_string();
    }
    let base = if host.ends_with('/') {
        host.to_string()
    } else {
        format!("{host}/")
    };
    url::Url::parse(&base)
        .and_then(|base| base.join(url))
        .map_or_else(
            |_| format!("{base}{}", url.trim_start_matches('/')),
            String::from,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stored() -> StoredFileRecord {
        StoredFileRecord {
            filename: "a.png".into(),
            originalname: "A.png".into(),
            path: "images".into(),
            size: 2048,
            filetype: "image/png".into(),
            width: 640,
            height: 480,
        }
    }

    fn widget(record: StoredFileRecord, auto_cleanup: bool) -> LocalImageWidget {
        let mut props = WidgetProps::new("image", record);
        props.auto_cleanup = auto_cleanup;
        LocalImageWidget::new(props)
    }

    fn choose(name: &str) -> WidgetEvent {
        WidgetEvent::FileChosen {
            input_value: format!("C:\\fakepath\\{name}"),
            preview: format!("blob:{name}"),
        }
    }

    #[test]
    fn test_removal_policy() {
        assert_eq!(removal_action(false, false), FileAction::Reset);
        assert_eq!(removal_action(false, true), FileAction::Delete);
        assert_eq!(removal_action(true, false), FileAction::Delete);
        assert_eq!(removal_action(true, true), FileAction::Reset);
    }

    #[test]
    fn test_plain_click_without_auto_cleanup_resets() {
        let mut w = widget(stored(), false);
        w.dispatch(WidgetEvent::RemoveClicked { modifier: false });
        assert_eq!(w.state(), &PendingState::RemovalQueued { action: FileAction::Reset });
        assert_eq!(w.banner(), Some("File removed - save to confirm"));
    }

    #[test]
    fn test_plain_click_with_auto_cleanup_deletes() {
        let mut w = widget(stored(), true);
        w.dispatch(WidgetEvent::RemoveClicked { modifier: false });
        assert_eq!(w.state(), &PendingState::RemovalQueued { action: FileAction::Delete });
        assert_eq!(w.banner(), Some("File deleted - save to confirm"));
    }

    #[test]
    fn test_remove_ignored_without_existing_file() {
        let mut w = widget(StoredFileRecord::empty(), false);
        w.dispatch(WidgetEvent::RemoveClicked { modifier: false });
        assert_eq!(w.state(), &PendingState::Clean);
        assert_eq!(w.clear_button(), None);
    }

    #[test]
    fn test_file_choice_overrides_removal() {
        let mut w = widget(stored(), false);
        w.dispatch(WidgetEvent::RemoveClicked { modifier: true });
        w.dispatch(choose("b.png"));

        assert_eq!(w.state(), &PendingState::LocalSelected { source: "blob:b.png".into() });
        assert_eq!(w.pending_action(), None);
        assert_eq!(w.local_filename(), "b.png");
        assert_eq!(w.banner(), Some("File selected - save to upload"));
    }

    #[test]
    fn test_cancel_upload_clears_input() {
        let mut w = widget(StoredFileRecord::empty(), false);
        w.dispatch(choose("b.png"));
        assert_eq!(w.clear_button(), Some(ClearButton::CancelUpload));
        assert_eq!(w.upload_label(), "Change Image");

        w.dispatch(WidgetEvent::CancelUpload);
        assert_eq!(w.state(), &PendingState::Clean);
        assert_eq!(w.input_value(), "");
        assert_eq!(w.upload_label(), "Upload Image");
    }

    #[test]
    fn test_undo_remove() {
        let mut w = widget(stored(), true);
        w.dispatch(WidgetEvent::RemoveClicked { modifier: false });
        assert_eq!(w.clear_button(), Some(ClearButton::UndoRemove));
        assert_eq!(w.preview_source(), None);

        w.dispatch(ClearButton::UndoRemove.event(false));
        assert_eq!(w.state(), &PendingState::Clean);
        assert_eq!(w.clear_button(), Some(ClearButton::Remove { auto_cleanup: true }));
        assert_eq!(w.clear_button().map(ClearButton::label), Some("Delete File"));
    }

    #[test]
    fn test_local_filename_without_fake_path() {
        let mut w = widget(StoredFileRecord::empty(), false);
        w.dispatch(WidgetEvent::FileChosen {
            input_value: "photo.png".into(),
            preview: "data:".into(),
        });
        assert_eq!(w.local_filename(), "photo.png");
    }

    #[test]
    fn test_stored_source_resolution() {
        let mut props = WidgetProps::new("image", stored());
        assert_eq!(LocalImageWidget::new(props.clone()).stored_source().as_deref(), Some("images/a.png"));

        props.host = "https://cdn.example.com".into();
        assert_eq!(
            LocalImageWidget::new(props.clone()).stored_source().as_deref(),
            Some("https://cdn.example.com/images/a.png")
        );

        props.host = "https://example.com/static".into();
        props.url = "/media/a.png".into();
        assert_eq!(
            LocalImageWidget::new(props).stored_source().as_deref(),
            Some("https://example.com/media/a.png")
        );
    }

    #[test]
    fn test_collapse() {
        let mut props = WidgetProps::new("image", StoredFileRecord::empty());
        props.collapse = true;
        let mut w = LocalImageWidget::new(props.clone());
        assert!(w.is_collapsed());
        w.dispatch(WidgetEvent::Expand);
        assert!(!w.is_collapsed());

        props.record = stored();
        assert!(!LocalImageWidget::new(props).is_collapsed());
    }

    fn event_strategy() -> impl Strategy<Value = WidgetEvent> {
        prop_oneof![
            "[a-z]{1,8}\\.png".prop_map(|name| choose(&name)),
            any::<bool>().prop_map(|modifier| WidgetEvent::RemoveClicked { modifier }),
            Just(WidgetEvent::CancelUpload),
            Just(WidgetEvent::UndoRemove),
        ]
    }

    proptest! {
        #[test]
        fn pending_state_invariants(
            existing in any::<bool>(),
            auto_cleanup in any::<bool>(),
            events in prop::collection::vec(event_strategy(), 0..24),
        ) {
            let record = if existing { stored() } else { StoredFileRecord::empty() };
            let mut w = widget(record, auto_cleanup);

            for event in events {
                let chose_file = matches!(event, WidgetEvent::FileChosen { .. });
                w.dispatch(event);

                prop_assert!(!(w.has_local() && w.removal_queued()));
                prop_assert_eq!(w.pending_action().is_some(), w.removal_queued());
                if w.removal_queued() {
                    prop_assert!(w.has_existing());
                }
                if chose_file {
                    prop_assert!(w.has_local());
                }
                prop_assert_eq!(w.banner().is_some(), w.state() != &PendingState::Clean);
                prop_assert_eq!(w.clear_button().is_some(), w.has_file());
            }
        }
    }
}
