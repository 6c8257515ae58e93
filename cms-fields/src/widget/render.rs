//! Widget rendering to HTML
//!
//! Produces the field's fragment of the edit form with proper escaping. The
//! output is a pure function of the widget's props and pending state.

use std::fmt::Write;

use super::LocalImageWidget;

/// Renders local image widgets to HTML
pub struct WidgetRenderer;

impl WidgetRenderer {
    /// Render a widget to an HTML string
    #[must_use]
    pub fn render(widget: &LocalImageWidget) -> String {
        let props = widget.props();
        let mut html = String::with_capacity(1024);

        let _ = writeln!(
            html,
            r#"<div class="field field-type-localimage" data-field-path="{}">"#,
            Self::escape_attr(&props.path)
        );

        if widget.is_collapsed() && !props.noedit {
            let _ = writeln!(
                html,
                r#"  <button type="button" class="collapsed-field-label">+ Add {}</button>"#,
                Self::escape_html(&props.label)
            );
            html.push_str("</div>");
            return html;
        }

        let _ = writeln!(
            html,
            r#"  <label class="field-label" for="{}">{}</label>"#,
            Self::escape_attr(&props.paths.upload),
            Self::escape_html(&props.label)
        );
        html.push_str("  <div class=\"field-ui\">\n");

        if props.noedit {
            Self::render_readonly(&mut html, widget);
        } else {
            Self::render_editable(&mut html, widget);
        }

        if let Some(ref note) = props.note {
            let _ = writeln!(html, r#"    <div class="field-note">{}</div>"#, Self::escape_html(note));
        }

        html.push_str("  </div>\n</div>");
        html
    }

    fn render_readonly(html: &mut String, widget: &LocalImageWidget) {
        if widget.has_existing() {
            Self::render_details(html, widget);
        } else {
            html.push_str("    <div class=\"help-block\">no file</div>\n");
        }
    }

    fn render_editable(html: &mut String, widget: &LocalImageWidget) {
        let props = widget.props();

        Self::render_details(html, widget);

        if let Some(banner) = widget.banner() {
            let class = if widget.has_local() {
                "upload-queued"
            } else {
                "delete-queued"
            };
            let _ = writeln!(html, r#"    <div class="{class}">{banner}</div>"#);
        }

        html.push_str("    <div class=\"file-toolbar\">\n");
        let _ = writeln!(
            html,
            r#"      <button type="button" class="file-upload-button">{}</button>"#,
            widget.upload_label()
        );
        if let Some(clear) = widget.clear_button() {
            let _ = writeln!(
                html,
                r#"      <button type="button" class="file-clear-button">{}</button>"#,
                clear.label()
            );
        }
        html.push_str("    </div>\n");

        let _ = writeln!(
            html,
            r#"    <input type="file" name="{}" id="{}" class="field-upload" accept="image/*" hidden>"#,
            Self::escape_attr(&props.paths.upload),
            Self::escape_attr(&props.paths.upload)
        );
        let _ = writeln!(
            html,
            r#"    <input type="hidden" name="{}" value="{}">"#,
            Self::escape_attr(&props.paths.action),
            widget.pending_action().map_or("", |action| action.as_str())
        );
    }

    fn render_details(html: &mut String, widget: &LocalImageWidget) {
        let record = &widget.props().record;

        html.push_str("    <div class=\"file-details\">\n");
        match widget.preview_source() {
            Some(source) if widget.has_local() => {
                let _ = writeln!(
                    html,
                    r#"      <div class="image-preview"><img src="{}" alt="{}"></div>"#,
                    Self::escape_attr(&source),
                    Self::escape_attr(widget.local_filename())
                );
                let _ = writeln!(
                    html,
                    r#"      <div class="image-values">{}</div>"#,
                    Self::escape_html(widget.local_filename())
                );
            }
            Some(source) => {
                let _ = writeln!(
                    html,
                    r#"      <div class="image-preview"><a href="{src}" target="_blank"><img src="{src}" title="{} Kb" alt="{}"></a></div>"#,
                    kilobytes(record.size),
                    Self::escape_attr(&record.filename),
                    src = Self::escape_attr(&source),
                );
                let _ = writeln!(
                    html,
                    r#"      <div class="image-values"><div class="image-dimensions">{} x {}</div><div class="image-source">{}</div></div>"#,
                    record.width,
                    record.height,
                    Self::escape_html(&source)
                );
            }
            None => {
                html.push_str("      <div class=\"image-preview image-preview--empty\">No image</div>\n");
            }
        }
        html.push_str("    </div>\n");
    }

    /// Escape a string for use in an HTML attribute
    fn escape_attr(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('"', "&quot;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    /// Escape a string for use in HTML content
    fn escape_html(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }
}

/// Size in kilobytes, rounded to the nearest whole number
const fn kilobytes(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::localimage::StoredFileRecord;
    use crate::widget::{WidgetEvent, WidgetProps};

    fn stored() -> StoredFileRecord {
        StoredFileRecord {
            filename: "a.png".into(),
            originalname: "a.png".into(),
            path: "images".into(),
            size: 3000,
            filetype: "image/png".into(),
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn test_render_empty() {
        let widget = LocalImageWidget::new(WidgetProps::new("image", StoredFileRecord::empty()));
        let html = widget.render();

        assert!(html.contains("No image"));
        assert!(html.contains("Upload Image"));
        assert!(html.contains(r#"name="image_upload""#));
        assert!(html.contains(r#"name="image_action" value="""#));
        assert!(!html.contains("file-clear-button"));
    }

    #[test]
    fn test_render_existing() {
        let mut props = WidgetProps::new("image", stored());
        props.host = "https://cdn.example.com".into();
        let html = LocalImageWidget::new(props).render();

        assert!(html.contains(r#"src="https://cdn.example.com/images/a.png""#));
        assert!(html.contains(r#"title="3 Kb""#));
        assert!(html.contains("640 x 480"));
        assert!(html.contains("Change Image"));
        assert!(html.contains("Remove File"));
    }

    #[test]
    fn test_render_removal_queued() {
        let mut props = WidgetProps::new("image", stored());
        props.auto_cleanup = true;
        let mut widget = LocalImageWidget::new(props);
        widget.dispatch(WidgetEvent::RemoveClicked { modifier: false });
        let html = widget.render();

        assert!(html.contains("No image"));
        assert!(html.contains("File deleted - save to confirm"));
        assert!(html.contains("Undo Remove"));
        assert!(html.contains(r#"name="image_action" value="delete""#));
    }

    #[test]
    fn test_render_local_selection() {
        let mut widget = LocalImageWidget::new(WidgetProps::new("image", stored()));
        widget.dispatch(WidgetEvent::FileChosen {
            input_value: "C:\\fakepath\\<b>.png".into(),
            preview: "blob:1".into(),
        });
        let html = widget.render();

        assert!(html.contains("File selected - save to upload"));
        assert!(html.contains("Cancel Upload"));
        assert!(html.contains(r#"src="blob:1""#));
        assert!(html.contains("&lt;b&gt;.png"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_render_readonly() {
        let mut props = WidgetProps::new("image", StoredFileRecord::empty());
        props.noedit = true;
        props.note = Some("PNG only".into());
        let html = LocalImageWidget::new(props).render();

        assert!(html.contains("no file"));
        assert!(html.contains("PNG only"));
        assert!(!html.contains("<input"));
        assert!(!html.contains("Upload Image"));
    }

    #[test]
    fn test_render_collapsed() {
        let mut props = WidgetProps::new("image", StoredFileRecord::empty());
        props.collapse = true;
        props.label = "Hero Image".into();
        let html = LocalImageWidget::new(props).render();

        assert!(html.contains("+ Add Hero Image"));
        assert!(!html.contains("<input"));
    }

    #[test]
    fn test_kilobytes_rounding() {
        assert_eq!(kilobytes(0), 0);
        assert_eq!(kilobytes(511), 0);
        assert_eq!(kilobytes(512), 1);
        assert_eq!(kilobytes(3000), 3);
    }
}
