//! RFC 5322 header access: unfolding, parameter extraction, and RFC 2047
//! encoded-word decoding.
//!
//! Headers are kept as raw text blocks on the part tree; everything here
//! reads values out of such a block without modifying it.

use tracing::warn;

use crate::parser::encoding;

/// Get the first value for a header name from a raw header block
/// (case-insensitive). Continuation lines are unfolded with a single space.
pub fn get_header(block: &str, name: &str) -> Option<String> {
    let mut current: Option<String> = None;
    for line in block.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(value) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if current.is_some() {
            break;
        }
        if let Some(colon) = line.find(':') {
            if line[..colon].trim().eq_ignore_ascii_case(name) {
                current = Some(line[colon + 1..].trim().to_string());
            }
        }
    }
    current
}

/// The value token of a structured header: everything before the first `;`.
pub fn header_value(raw: &str) -> &str {
    raw.split(';').next().unwrap_or("").trim()
}

/// Extract a `name=value` parameter from a structured header value
/// (case-insensitive name, surrounding quotes stripped).
pub fn header_param(raw: &str, name: &str) -> Option<String> {
    for segment in raw.split(';').skip(1) {
        if let Some((key, value)) = segment.split_once('=') {
            if key.trim().eq_ignore_ascii_case(name) {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // If the gap between two encoded words is only whitespace, skip it (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        match decode_one_word(&remaining[start + 2..]) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &remaining[start + 2 + consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = &remaining[start + 2..];
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// Decode one `charset?encoding?text?=` token. Returns the decoded text and
/// the number of bytes consumed after the initial `=?`.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let word_encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match word_encoding {
        "B" | "b" => encoding::decode_base64(encoded_text).ok()?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(
                    std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("00"),
                    16,
                ) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match charset.to_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(enc) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = enc.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(
                    charset = charset,
                    "Unknown charset, falling back to UTF-8 lossy"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_header_simple() {
        let block = "From: user@example.com\nSubject: Hi\n";
        assert_eq!(get_header(block, "subject").as_deref(), Some("Hi"));
        assert_eq!(
            get_header(block, "From").as_deref(),
            Some("user@example.com")
        );
        assert_eq!(get_header(block, "Date"), None);
    }

    #[test]
    fn test_get_header_unfolds() {
        let block = "Content-Type: multipart/mixed;\n\tboundary=\"abc\"\nSubject: x\n";
        assert_eq!(
            get_header(block, "content-type").as_deref(),
            Some("multipart/mixed; boundary=\"abc\"")
        );
    }

    #[test]
    fn test_header_value_strips_params() {
        assert_eq!(header_value("text/plain; charset=utf-8"), "text/plain");
        assert_eq!(header_value(" inline "), "inline");
    }

    #[test]
    fn test_header_param_quoted() {
        assert_eq!(
            header_param("attachment; filename=\"a b.pdf\"", "filename").as_deref(),
            Some("a b.pdf")
        );
    }

    #[test]
    fn test_header_param_unquoted_and_case() {
        assert_eq!(
            header_param("multipart/mixed; BOUNDARY=xyz", "boundary").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn test_header_param_missing() {
        assert_eq!(header_param("attachment", "filename"), None);
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="),
            "Hola mundo"
        );
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="),
            "Hola mundo"
        );
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        assert_eq!(
            decode_encoded_words("Re: =?UTF-8?B?SG9sYQ==?= there"),
            "Re: Hola there"
        );
    }

    #[test]
    fn test_decode_plain_passthrough() {
        assert_eq!(decode_encoded_words("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        assert_eq!(decode_encoded_words("=?Windows-1252?Q?M=FCller?="), "Müller");
    }
}
