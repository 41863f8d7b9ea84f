//! Attachment detachment: walking messages, extracting oversized
//! attachments, and committing the rewritten archive.

pub mod classify;
pub mod filename;
pub mod store;
pub mod walker;

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::archive::MboxArchive;
use crate::config::DEFAULT_SIZE_THRESHOLD;
use crate::error::{DetachError, Result};
use crate::parser::date::TzTable;
use crate::parser::mime::parse_message;

use walker::Walker;

/// Archive files are identified strictly by this extension.
const ARCHIVE_EXTENSION: &str = "mbox";

/// Run-wide settings.
#[derive(Debug, Clone)]
pub struct Options {
    /// Attachments with encoded size strictly greater than this many bytes
    /// are detached.
    pub threshold: u64,
    /// Timezone abbreviation table for Date header parsing.
    pub tz: TzTable,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIZE_THRESHOLD,
            tz: TzTable::default(),
        }
    }
}

/// Process a single archive file or every `.mbox` file in a directory.
///
/// Directory runs continue past individual archive failures: each failure is
/// logged and counted, the remaining archives are still attempted, and the
/// run ends with [`DetachError::Batch`] if anything failed.
///
/// Returns the total number of attachments removed.
pub fn process_path(path: &Path, options: &Options) -> Result<u64> {
    if !path.is_dir() {
        if !has_archive_extension(path) {
            warn!(path = %path.display(), "Not an .mbox file, skipping");
            return Ok(0);
        }
        return process_archive(path, options);
    }

    let mut archives: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| DetachError::io(path, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| has_archive_extension(p))
        .collect();
    archives.sort();

    let mut total = 0;
    let mut failed = 0;
    for archive_path in &archives {
        match process_archive(archive_path, options) {
            Ok(count) => total += count,
            Err(e) => {
                failed += 1;
                error!(archive = %archive_path.display(), error = %e, "Archive processing failed");
            }
        }
    }

    if failed > 0 {
        return Err(DetachError::Batch {
            failed,
            attempted: archives.len(),
        });
    }
    Ok(total)
}

/// Process exactly one archive: lock, walk every message, commit, unlock.
///
/// The archive is flushed and closed on every exit path — substitutions
/// completed before a mid-run failure are committed, and the lock never
/// outlives the call.
pub fn process_archive(path: &Path, options: &Options) -> Result<u64> {
    let destination = attachments_dir(path);
    let mut archive = MboxArchive::open(path)?;

    let outcome = strip_messages(&mut archive, &destination, options);
    let flushed = archive.flush();
    let closed = archive.close();
    let removed = outcome?;
    flushed?;
    closed?;

    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    println!("Removed {removed} attachments from {display_name}.");
    info!(archive = %path.display(), removed, "Archive processed");
    Ok(removed)
}

fn strip_messages(archive: &mut MboxArchive, destination: &Path, options: &Options) -> Result<u64> {
    let mut removed = 0;
    for key in 0..archive.len() {
        let raw = archive.read_message(key)?;
        let text = String::from_utf8_lossy(&raw).into_owned();
        let mut message = parse_message(&text);

        // Snapshot once per message; reused for every attachment within it
        let date_header = message.header("Date");
        let from_header = message.header("From");

        let walker = Walker {
            threshold: options.threshold,
            destination,
            tz: &options.tz,
            date_header: date_header.as_deref(),
            from_header: from_header.as_deref(),
        };
        let count = walker.walk(&mut message)?;
        if count > 0 {
            archive.replace(key, message.to_text().into_bytes());
            removed += count;
        }
    }
    Ok(removed)
}

/// Destination folder for an archive's attachments: `{stem} attachments`,
/// a sibling of the archive file.
pub fn attachments_dir(archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("archive");
    archive_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{stem} attachments"))
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == ARCHIVE_EXTENSION)
}
