//! MIME tree construction: raw message text to a mutable [`Part`] tree.
//!
//! Parsing is lossless for the parts this tool leaves alone: header blocks
//! and payload text are kept verbatim, and boundary lines are the only thing
//! reconstructed on serialization.

use crate::model::part::{Body, Multipart, Part};
use crate::parser::header;

/// Parse a complete message (or one multipart section) into a part tree.
///
/// Malformed structure degrades gracefully: a multipart declaration without
/// a boundary, or a boundary that never appears in the body, yields a leaf
/// part with the body kept as text.
pub fn parse_message(text: &str) -> Part {
    let (header_block, body_text) = split_headers(text);

    let content_type = header::get_header(header_block, "Content-Type");
    let is_multipart = content_type
        .as_deref()
        .map(|ct| header::header_value(ct).to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false);

    let body = if is_multipart {
        content_type
            .as_deref()
            .and_then(|ct| header::header_param(ct, "boundary"))
            .and_then(|boundary| parse_multipart(body_text, &boundary))
            .map(Body::Multipart)
            .unwrap_or_else(|| Body::Text(body_text.to_string()))
    } else {
        Body::Text(body_text.to_string())
    };

    Part {
        headers: header_block.to_string(),
        body,
    }
}

/// Split a message at its first blank line into (header block, body).
///
/// Both halves keep their original line endings; the blank line itself
/// belongs to neither.
fn split_headers(text: &str) -> (&str, &str) {
    let mut pos = 0;
    while pos < text.len() {
        let end = match text[pos..].find('\n') {
            Some(i) => pos + i + 1,
            None => text.len(),
        };
        let line = &text[pos..end];
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return (&text[..pos], &text[end..]);
        }
        pos = end;
    }
    (text, "")
}

enum BoundaryState {
    Preamble,
    Section,
    Epilogue,
}

fn parse_multipart(body: &str, boundary: &str) -> Option<Multipart> {
    let delimiter = format!("--{boundary}");
    let closer = format!("--{boundary}--");

    let mut state = BoundaryState::Preamble;
    let mut preamble = String::new();
    let mut sections: Vec<String> = Vec::new();
    let mut epilogue = String::new();
    let mut eol = String::from("\n");

    for line in lines_with_endings(body) {
        // Trailing whitespace after a boundary is transport padding
        let content = line.trim_end();
        if !matches!(state, BoundaryState::Epilogue) && content == closer {
            state = BoundaryState::Epilogue;
            continue;
        }
        if !matches!(state, BoundaryState::Epilogue) && content == delimiter {
            if matches!(state, BoundaryState::Preamble) && line.ends_with("\r\n") {
                eol = String::from("\r\n");
            }
            sections.push(String::new());
            state = BoundaryState::Section;
            continue;
        }
        match state {
            BoundaryState::Preamble => preamble.push_str(line),
            BoundaryState::Section => {
                if let Some(section) = sections.last_mut() {
                    section.push_str(line);
                }
            }
            BoundaryState::Epilogue => epilogue.push_str(line),
        }
    }

    if sections.is_empty() {
        return None;
    }

    let children = sections.iter().map(|s| parse_message(s)).collect();
    Some(Multipart {
        boundary: boundary.to_string(),
        eol,
        preamble,
        children,
        epilogue,
    })
}

/// Iterate over lines including their terminating newline bytes.
fn lines_with_endings(text: &str) -> impl Iterator<Item = &str> {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= text.len() {
            return None;
        }
        let end = match text[pos..].find('\n') {
            Some(i) => pos + i + 1,
            None => text.len(),
        };
        let line = &text[pos..end];
        pos = end;
        Some(line)
    })
}
