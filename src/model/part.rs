//! Mutable MIME part tree.
//!
//! A [`Part`] is either a leaf carrying its transport-encoded payload text
//! verbatim, or a multipart container with an ordered child sequence that
//! can be rebuilt in place. Header blocks are kept as raw text so that
//! serializing an unmodified subtree reproduces its original bytes.

use crate::error::{DetachError, Result};
use crate::parser::{encoding, header};

/// One node of a message's MIME tree. The top-level message is itself a part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Raw header block, each line with its original ending. May be empty.
    pub headers: String,
    pub body: Body,
}

/// Payload of a [`Part`].
#[derive(Debug, Clone)]
pub enum Body {
    /// Leaf payload in its transport-encoded form, verbatim.
    Text(String),
    /// Multipart container with ordered children.
    Multipart(Multipart),
}

/// Body of a multipart container.
#[derive(Debug, Clone)]
pub struct Multipart {
    /// Boundary token without the leading `--`.
    pub boundary: String,
    /// Line ending used when reconstructing boundary lines.
    pub eol: String,
    /// Raw text before the first boundary line.
    pub preamble: String,
    pub children: Vec<Part>,
    /// Raw text after the closing boundary line.
    pub epilogue: String,
}

impl Part {
    /// Build a `text/plain` leaf part with the given body text.
    pub fn text_part(body: String, eol: &str) -> Self {
        let headers = format!(
            "Content-Type: text/plain; charset=\"us-ascii\"{eol}\
             MIME-Version: 1.0{eol}\
             Content-Transfer-Encoding: 7bit{eol}"
        );
        Self {
            headers,
            body: Body::Text(body),
        }
    }

    /// First value of the named header, unfolded (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        header::get_header(&self.headers, name)
    }

    /// Declared content type as `type/subtype`, lowercased.
    ///
    /// A part without a Content-Type header defaults to `text/plain`,
    /// matching RFC 2045 §5.2.
    pub fn content_type(&self) -> String {
        self.header("Content-Type")
            .map(|v| header::header_value(&v).to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "text/plain".to_string())
    }

    /// First token of the Content-Disposition header, lowercased.
    pub fn content_disposition(&self) -> Option<String> {
        self.header("Content-Disposition")
            .map(|v| header::header_value(&v).to_lowercase())
    }

    /// Declared attachment filename, with RFC 2047 encoded-words resolved.
    ///
    /// Prefers the Content-Disposition `filename` parameter, falling back to
    /// the Content-Type `name` parameter.
    pub fn filename(&self) -> Option<String> {
        if let Some(value) = self
            .header("Content-Disposition")
            .and_then(|v| header::header_param(&v, "filename"))
        {
            return Some(header::decode_encoded_words(&value));
        }
        self.header("Content-Type")
            .and_then(|v| header::header_param(&v, "name"))
            .map(|v| header::decode_encoded_words(&v))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    pub fn multipart_mut(&mut self) -> Option<&mut Multipart> {
        match &mut self.body {
            Body::Multipart(mp) => Some(mp),
            Body::Text(_) => None,
        }
    }

    /// The transport-encoded payload text of a leaf part.
    ///
    /// Containers have no encoded-text representation; asking for one is a
    /// contract violation surfaced as [`DetachError::BinaryPayload`].
    pub fn encoded_text(&self) -> Result<&str> {
        match &self.body {
            Body::Text(text) => Ok(text),
            Body::Multipart(_) => Err(DetachError::BinaryPayload),
        }
    }

    /// Decode the payload to raw bytes per its Content-Transfer-Encoding.
    ///
    /// `base64` and `quoted-printable` are decoded; every other encoding
    /// (7bit, 8bit, binary, absent) passes the payload bytes through.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        let text = self.encoded_text()?;
        let transfer_encoding = self
            .header("Content-Transfer-Encoding")
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default();
        match transfer_encoding.as_str() {
            "base64" => encoding::decode_base64(text),
            "quoted-printable" => Ok(encoding::decode_quoted_printable(text)),
            _ => Ok(text.as_bytes().to_vec()),
        }
    }

    /// Serialize the part (headers, blank line, body) back to text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.headers);
        out.push_str(self.eol());
        match &self.body {
            Body::Text(text) => out.push_str(text),
            Body::Multipart(mp) => {
                out.push_str(&mp.preamble);
                for child in &mp.children {
                    out.push_str("--");
                    out.push_str(&mp.boundary);
                    out.push_str(&mp.eol);
                    child.write(out);
                }
                out.push_str("--");
                out.push_str(&mp.boundary);
                out.push_str("--");
                out.push_str(&mp.eol);
                out.push_str(&mp.epilogue);
            }
        }
    }

    /// Line ending style of this part's header block.
    fn eol(&self) -> &'static str {
        if self.headers.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }
}
