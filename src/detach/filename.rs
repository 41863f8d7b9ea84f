//! Storage filename synthesis.
//!
//! Filenames are `{YYYYMMDDTHHMM} from-{sender} {attachment name}`, built
//! from the message's Date and From headers so the stored file stays
//! traceable to its message. Deterministic for fixed inputs.

use std::path::Path;

use crate::error::{DetachError, Result};
use crate::model::address;
use crate::parser::date::{parse_date_header, TzTable};

/// Characters that cannot appear in filenames on at least one supported
/// filesystem.
const RESERVED: &[char] = &[
    '<', '>', ':', '"', '/', '\\', '|', '?', '*', '\t', '\n', '\r', '\0',
];

/// Derive the storage filename for an attachment from its message metadata.
///
/// Errors if the Date header survives no parsing strategy or the From header
/// contains no email address; either aborts the archive run.
pub fn synthesize(
    attachment_name: &str,
    date_header: &str,
    from_header: &str,
    tz: &TzTable,
) -> Result<String> {
    let timestamp = parse_date_header(date_header, tz)?;
    let sender = address::first_address(from_header)
        .ok_or_else(|| DetachError::NoSenderAddress(from_header.to_string()))?;
    let composed = format!(
        "{} from-{sender} {attachment_name}",
        timestamp.format("%Y%m%dT%H%M")
    );
    Ok(sanitize(&composed))
}

/// Replace every reserved character with `-`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if RESERVED.contains(&c) { '-' } else { c })
        .collect()
}

/// Break a collision with an existing file by prefixing the content's hex
/// MD5 digest.
///
/// First writer wins the plain name; later writers of different content get
/// a hash-qualified name. A true duplicate (identical bytes and name) still
/// collides and overwrites.
pub fn resolve_collision(dir: &Path, name: &str, content: &[u8]) -> String {
    if dir.join(name).exists() {
        format!("{:x} {name}", md5::compute(content))
    } else {
        name.to_string()
    }
}
