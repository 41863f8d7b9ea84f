//! Content-Transfer-Encoding decoders (base64 and quoted-printable).

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;

use crate::error::{DetachError, Result};

/// Decode a base64 payload, ignoring embedded whitespace.
///
/// Real-world payloads are line-wrapped and occasionally mispadded, so a
/// strict decode is retried without padding before giving up.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if let Ok(bytes) = STANDARD.decode(&cleaned) {
        return Ok(bytes);
    }
    let end = cleaned
        .iter()
        .rposition(|&b| b != b'=')
        .map(|i| i + 1)
        .unwrap_or(0);
    STANDARD_NO_PAD
        .decode(&cleaned[..end])
        .map_err(|e| DetachError::Decode(format!("invalid base64 payload: {e}")))
}

/// Decode a quoted-printable body (RFC 2045 §6.7).
///
/// Handles `=XX` escapes and soft line breaks. Unlike the Q-encoding used in
/// headers, underscores are literal here.
pub fn decode_quoted_printable(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'=' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        // Soft line break: "=\n" or "=\r\n"
        if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            i += 2;
            continue;
        }
        if i + 2 < bytes.len() && bytes[i + 1] == b'\r' && bytes[i + 2] == b'\n' {
            i += 3;
            continue;
        }
        if i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(b'=');
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_plain() {
        assert_eq!(decode_base64("SGVsbG8=").unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_base64_wrapped_lines() {
        assert_eq!(
            decode_base64("SGVs\nbG8s\r\nIHdvcmxkIQ==\n").unwrap(),
            b"Hello, world!"
        );
    }

    #[test]
    fn test_decode_base64_missing_padding() {
        assert_eq!(decode_base64("SGVsbG8").unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_base64_garbage() {
        assert!(decode_base64("not base64 at all!!").is_err());
    }

    #[test]
    fn test_decode_qp_escapes() {
        assert_eq!(decode_quoted_printable("caf=E9"), b"caf\xe9");
    }

    #[test]
    fn test_decode_qp_soft_break() {
        assert_eq!(decode_quoted_printable("foo=\r\nbar=\nbaz"), b"foobarbaz");
    }

    #[test]
    fn test_decode_qp_literal_underscore() {
        assert_eq!(decode_quoted_printable("a_b"), b"a_b");
    }

    #[test]
    fn test_decode_qp_stray_equals() {
        assert_eq!(decode_quoted_printable("a=zb"), b"a=zb");
    }
}
