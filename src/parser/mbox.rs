//! MBOX framing scanner.
//!
//! Reads an MBOX file sequentially and records the byte span of every
//! message. Never loads the file into memory. Tolerant of:
//!
//! - Mixed `\n` and `\r\n` line endings
//! - `From ` lines not preceded by a blank line (logs a warning)
//! - Truncated messages at EOF
//! - NUL bytes and other binary content in the body
//! - UTF-8 BOM at the start of the file

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::error::{DetachError, Result};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Byte span of one message inside an MBOX file.
#[derive(Debug, Clone, Copy)]
pub struct MessageSpan {
    /// Offset of the `From ` separator line.
    pub offset: u64,
    /// Length of the separator line, including its newline.
    pub sep_len: u64,
    /// Total length of the message including the separator line.
    pub len: u64,
}

/// Scan an MBOX file and return the span of every message, in file order.
///
/// A non-empty file whose first line is not a `From ` separator is rejected
/// as [`DetachError::InvalidMbox`] — rewriting such a file would silently
/// drop whatever precedes the first separator.
pub fn scan_messages(path: &Path) -> Result<Vec<MessageSpan>> {
    let file = File::open(path).map_err(|e| DetachError::io(path, e))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    let mut spans: Vec<MessageSpan> = Vec::new();
    let mut current_offset: u64 = 0;
    let mut prev_line_was_empty = true;
    let mut first_line = true;

    // Reusable line buffer — avoids allocation per line
    let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

    loop {
        line_buf.clear();
        let line_len = {
            let buf = reader.fill_buf().map_err(|e| DetachError::io(path, e))?;
            if buf.is_empty() {
                break; // EOF
            }
            let consume_len = match memchr_newline(buf) {
                Some(pos) => pos + 1,
                None => buf.len(),
            };
            line_buf.extend_from_slice(&buf[..consume_len]);
            reader.consume(consume_len);
            consume_len as u64
        };

        let is_from_line = is_mbox_separator(&line_buf);

        if first_line && !is_from_line {
            return Err(DetachError::InvalidMbox(path.to_path_buf()));
        }

        if is_from_line && (first_line || prev_line_was_empty) {
            close_last(&mut spans, current_offset);
            spans.push(MessageSpan {
                offset: current_offset,
                sep_len: line_len,
                len: 0,
            });
        } else if is_from_line {
            warn!(
                offset = current_offset,
                "Found 'From ' separator without preceding blank line"
            );
            close_last(&mut spans, current_offset);
            spans.push(MessageSpan {
                offset: current_offset,
                sep_len: line_len,
                len: 0,
            });
        }

        prev_line_was_empty = is_blank_line(&line_buf);
        first_line = false;
        current_offset += line_len;
    }

    close_last(&mut spans, current_offset);
    Ok(spans)
}

/// Record the end offset of the span currently being accumulated.
fn close_last(spans: &mut [MessageSpan], end_offset: u64) {
    if let Some(last) = spans.last_mut() {
        last.len = end_offset - last.offset;
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
