//! Centralized error types for mboxdetach.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxdetach library.
#[derive(Error, Debug)]
pub enum DetachError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file does not appear to be a valid MBOX.
    #[error("File does not appear to be a valid MBOX: {0}")]
    InvalidMbox(PathBuf),

    /// Another process holds the exclusive lock on the archive.
    #[error("Archive is locked by another process: {0}")]
    ArchiveLocked(PathBuf),

    /// The Date header survived none of the parsing strategies.
    #[error("Unparseable Date header: '{0}'")]
    DateParse(String),

    /// The From header contains nothing shaped like an email address.
    #[error("No email address found in From header: '{0}'")]
    NoSenderAddress(String),

    /// A header required for filename synthesis is absent from the message.
    #[error("Message has no {0} header")]
    MissingHeader(&'static str),

    /// A part's payload has no transport-encoded text representation.
    #[error("Part payload is not transport-encoded text")]
    BinaryPayload,

    /// A transfer-encoded payload could not be decoded.
    #[error("Decoding error: {0}")]
    Decode(String),

    /// One or more archives in a directory run failed.
    #[error("Failed to process {failed} of {attempted} archives")]
    Batch { failed: usize, attempted: usize },
}

/// Convenience alias for `Result<T, DetachError>`.
pub type Result<T> = std::result::Result<T, DetachError>;

impl DetachError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `DetachError`
/// when no path context is available (rare — prefer `DetachError::io`).
impl From<std::io::Error> for DetachError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
