//! Recursive message tree walk with in-place attachment replacement.

use std::path::Path;

use crate::error::{DetachError, Result};
use crate::model::part::{Body, Part};
use crate::parser::date::TzTable;

use super::classify::{classify, Classification};
use super::store;

/// One walk over one message's part tree.
///
/// Carries the per-message header snapshot (Date and From are read once per
/// message and reused for every attachment found within it) together with
/// the run-wide settings.
pub struct Walker<'a> {
    /// Attachments with encoded size strictly greater than this are removed.
    pub threshold: u64,
    /// Folder receiving this archive's extracted attachments.
    pub destination: &'a Path,
    pub tz: &'a TzTable,
    pub date_header: Option<&'a str>,
    pub from_header: Option<&'a str>,
}

impl Walker<'_> {
    /// Walk `node`, replacing oversized attachments in its subtree with
    /// placeholders. Returns the number of attachments removed.
    ///
    /// Containers are rebuilt from a snapshot of their children: the slot of
    /// each removed attachment gets its placeholder, every other slot keeps
    /// its original part, sibling order and indices undisturbed.
    pub fn walk(&self, node: &mut Part) -> Result<u64> {
        let Body::Multipart(container) = &mut node.body else {
            return Ok(0);
        };
        let container_eol = container.eol.clone();
        let children = std::mem::take(&mut container.children);

        let mut rebuilt = Vec::with_capacity(children.len());
        let mut removed = 0;

        for mut child in children {
            let content_type = child.content_type();
            // Body text is never an attachment candidate
            if content_type == "text/plain" || content_type == "text/html" {
                rebuilt.push(child);
                continue;
            }
            if child.is_multipart() {
                removed += self.walk(&mut child)?;
                rebuilt.push(child);
                continue;
            }
            match classify(&child)? {
                Classification::NotAttachment => rebuilt.push(child),
                Classification::EmbeddedMessage { name } => {
                    println!("Storing .eml files not supported, skipping {name}.");
                    rebuilt.push(child);
                }
                Classification::Attachment(info) if info.encoded_size > self.threshold => {
                    let date = self
                        .date_header
                        .ok_or(DetachError::MissingHeader("Date"))?;
                    let from = self
                        .from_header
                        .ok_or(DetachError::MissingHeader("From"))?;
                    println!(
                        "Removing attachment {} with size {:.0} kB.",
                        info.name,
                        info.encoded_size as f64 / 1e3
                    );
                    let stored = store::store_attachment(
                        &child,
                        &info.name,
                        self.destination,
                        date,
                        from,
                        self.tz,
                    )?;
                    rebuilt.push(store::placeholder(
                        &info.name,
                        &stored,
                        info.encoded_size,
                        &container_eol,
                    ));
                    removed += 1;
                }
                Classification::Attachment(_) => rebuilt.push(child),
            }
        }

        container.children = rebuilt;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mime::parse_message;

    fn walker<'a>(threshold: u64, destination: &'a Path, tz: &'a TzTable) -> Walker<'a> {
        Walker {
            threshold,
            destination,
            tz,
            date_header: Some("Mon, 01 Jan 2024 10:30:00 +0000"),
            from_header: Some("x@y.example"),
        }
    }

    #[test]
    fn test_leaf_message_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tz = TzTable::default();
        let mut message = parse_message("Content-Type: text/plain\n\njust text\n");
        let removed = walker(0, dir.path(), &tz).walk(&mut message).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_oversized_attachment_is_replaced_in_slot() {
        let dir = tempfile::tempdir().unwrap();
        let tz = TzTable::default();
        let raw = "Content-Type: multipart/mixed; boundary=\"b\"\n\n\
                   --b\n\
                   Content-Type: text/plain\n\n\
                   see attached\n\
                   --b\n\
                   Content-Type: application/octet-stream\n\
                   Content-Disposition: attachment; filename=\"big.bin\"\n\n\
                   0123456789abcdef\n\
                   --b--\n";
        let mut message = parse_message(raw);
        let removed = walker(4, dir.path(), &tz).walk(&mut message).unwrap();
        assert_eq!(removed, 1);

        let container = message.multipart_mut().unwrap();
        assert_eq!(container.children.len(), 2);
        assert_eq!(container.children[0].content_type(), "text/plain");
        assert_eq!(container.children[1].content_type(), "text/plain");
        assert!(container.children[1]
            .encoded_text()
            .unwrap()
            .contains("big.bin"));
    }

    #[test]
    fn test_undersized_attachment_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let tz = TzTable::default();
        let raw = "Content-Type: multipart/mixed; boundary=\"b\"\n\n\
                   --b\n\
                   Content-Disposition: attachment; filename=\"small.bin\"\n\
                   Content-Type: application/octet-stream\n\n\
                   tiny\n\
                   --b--\n";
        let mut message = parse_message(raw);
        let removed = walker(1_000_000, dir.path(), &tz).walk(&mut message).unwrap();
        assert_eq!(removed, 0);
        assert!(message.to_text().contains("small.bin"));
    }

    #[test]
    fn test_missing_date_header_is_fatal_when_extracting() {
        let dir = tempfile::tempdir().unwrap();
        let tz = TzTable::default();
        let raw = "Content-Type: multipart/mixed; boundary=\"b\"\n\n\
                   --b\n\
                   Content-Disposition: attachment; filename=\"big.bin\"\n\
                   Content-Type: application/octet-stream\n\n\
                   0123456789\n\
                   --b--\n";
        let mut message = parse_message(raw);
        let mut w = walker(1, dir.path(), &tz);
        w.date_header = None;
        let err = w.walk(&mut message).unwrap_err();
        assert!(matches!(err, DetachError::MissingHeader("Date")));
    }
}
