//! Attachment classification.
//!
//! Decides whether one leaf part is a storable attachment, resolves its
//! display name, and measures its encoded size for the threshold decision.

use uuid::Uuid;

use crate::error::Result;
use crate::model::part::Part;
use crate::parser::header;

/// Outcome of classifying one leaf part.
#[derive(Debug)]
pub enum Classification {
    /// Structural or body content, not a detachable object.
    NotAttachment,
    /// An embedded sub-message (`.eml`): unsupported for extraction.
    /// The caller logs this skip; it is not an error.
    EmbeddedMessage { name: String },
    /// A storable attachment.
    Attachment(AttachmentInfo),
}

/// Name and size of a classified attachment. Transient: consumed by storage
/// within the processing of a single part.
#[derive(Debug)]
pub struct AttachmentInfo {
    pub name: String,
    /// Length in bytes of the transport-encoded payload text. This is the
    /// on-disk footprint approximation used for the threshold decision, not
    /// the decoded byte count.
    pub encoded_size: u64,
}

/// Classify a leaf part.
///
/// Only parts whose Content-Disposition is `inline` or `attachment` are
/// candidates. A candidate without a declared filename gets a synthesized
/// one, unless it carries no Content-Type header at all — then no name can
/// be resolved and the part is not an attachment.
pub fn classify(part: &Part) -> Result<Classification> {
    let disposition = match part.content_disposition() {
        Some(d) if d == "inline" || d == "attachment" => d,
        _ => return Ok(Classification::NotAttachment),
    };

    let name = match part.filename() {
        Some(name) => name,
        None => match default_name(part, &disposition) {
            Some(name) => name,
            None => return Ok(Classification::NotAttachment),
        },
    };

    if name.ends_with(".eml") {
        return Ok(Classification::EmbeddedMessage { name });
    }

    let encoded_size = part.encoded_text()?.len() as u64;
    Ok(Classification::Attachment(AttachmentInfo {
        name,
        encoded_size,
    }))
}

/// Synthesize `{disposition}-{uuid}{extension}` for a nameless attachment,
/// guessing the extension from the declared content type (`.bin` when the
/// type is unknown).
fn default_name(part: &Part, disposition: &str) -> Option<String> {
    let content_type = part.header("Content-Type")?;
    let mime_type = header::header_value(&content_type);
    let extension = mime_guess::get_mime_extensions_str(mime_type)
        .and_then(|exts| exts.first())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| ".bin".to_string());
    Some(format!("{disposition}-{}{extension}", Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mime::parse_message;

    #[test]
    fn test_no_disposition_is_not_attachment() {
        let part = parse_message("Content-Type: application/pdf\n\n%PDF\n");
        assert!(matches!(
            classify(&part).unwrap(),
            Classification::NotAttachment
        ));
    }

    #[test]
    fn test_other_disposition_is_not_attachment() {
        let part = parse_message("Content-Disposition: form-data\n\nx\n");
        assert!(matches!(
            classify(&part).unwrap(),
            Classification::NotAttachment
        ));
    }

    #[test]
    fn test_named_attachment() {
        let part = parse_message(
            "Content-Type: application/pdf\n\
             Content-Disposition: attachment; filename=\"report.pdf\"\n\n\
             0123456789\n",
        );
        match classify(&part).unwrap() {
            Classification::Attachment(info) => {
                assert_eq!(info.name, "report.pdf");
                assert_eq!(info.encoded_size, 11); // payload text incl. newline
            }
            other => panic!("expected attachment, got {other:?}"),
        }
    }

    #[test]
    fn test_eml_attachment_is_skipped() {
        let part = parse_message(
            "Content-Disposition: attachment; filename=\"forwarded.eml\"\n\nx\n",
        );
        assert!(matches!(
            classify(&part).unwrap(),
            Classification::EmbeddedMessage { .. }
        ));
    }

    #[test]
    fn test_unnamed_with_content_type_gets_default_name() {
        let part = parse_message(
            "Content-Type: application/pdf\nContent-Disposition: inline\n\nx\n",
        );
        match classify(&part).unwrap() {
            Classification::Attachment(info) => {
                assert!(info.name.starts_with("inline-"));
                assert!(info.name.ends_with(".pdf"));
            }
            other => panic!("expected attachment, got {other:?}"),
        }
    }

    #[test]
    fn test_unnamed_unknown_type_gets_bin_extension() {
        let part = parse_message(
            "Content-Type: application/x-very-obscure\nContent-Disposition: attachment\n\nx\n",
        );
        match classify(&part).unwrap() {
            Classification::Attachment(info) => {
                assert!(info.name.starts_with("attachment-"));
                assert!(info.name.ends_with(".bin"));
            }
            other => panic!("expected attachment, got {other:?}"),
        }
    }

    #[test]
    fn test_unnamed_without_content_type_is_not_attachment() {
        let part = parse_message("Content-Disposition: attachment\n\nx\n");
        assert!(matches!(
            classify(&part).unwrap(),
            Classification::NotAttachment
        ));
    }
}
