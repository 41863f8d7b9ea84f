//! Message parsing: MBOX framing, MIME tree construction, header decoding,
//! date parsing, and transfer encodings.

pub mod date;
pub mod encoding;
pub mod header;
pub mod mbox;
pub mod mime;
