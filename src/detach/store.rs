//! Attachment persistence and placeholder construction.

use std::path::Path;

use tracing::debug;

use crate::error::{DetachError, Result};
use crate::model::part::Part;
use crate::parser::date::TzTable;

use super::filename;

/// Store one attachment's decoded bytes under its synthesized filename.
///
/// Returns the filename actually used (collision-qualified if needed).
pub fn store_attachment(
    part: &Part,
    attachment_name: &str,
    destination: &Path,
    date_header: &str,
    from_header: &str,
    tz: &TzTable,
) -> Result<String> {
    let synthesized = filename::synthesize(attachment_name, date_header, from_header, tz)?;

    std::fs::create_dir_all(destination).map_err(|e| DetachError::io(destination, e))?;

    let content = part.decode_body()?;
    let stored = filename::resolve_collision(destination, &synthesized, &content);
    let target = destination.join(&stored);
    std::fs::write(&target, &content).map_err(|e| DetachError::io(&target, e))?;
    debug!(file = %target.display(), bytes = content.len(), "Stored attachment");
    Ok(stored)
}

/// Build the placeholder part that takes a removed attachment's slot.
///
/// The note records the original name, its encoded size in kB, the removal
/// date, and the storage filename.
pub fn placeholder(
    attachment_name: &str,
    stored_filename: &str,
    encoded_size: u64,
    eol: &str,
) -> Part {
    let today = chrono::Local::now().format("%Y-%m-%d");
    let body = format!(
        "Attachment \"{attachment_name}\" with size {:.0} kB has been removed ({today}). \
         Storage filename: {stored_filename}\r\n",
        encoded_size as f64 / 1e3
    );
    Part::text_part(body, eol)
}
