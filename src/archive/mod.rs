//! Locked, mutable view of one MBOX archive.
//!
//! [`MboxArchive`] exposes the archive as an ordered key → message mapping.
//! Messages are read on demand from their byte spans; replacements are staged
//! in memory and committed by [`MboxArchive::flush`], which writes a sibling
//! temp file (unmodified messages copied verbatim, replaced ones from their
//! staged bytes) and atomically renames it over the archive.
//!
//! The exclusive advisory lock is taken at open and held until close; a
//! drop-time unlock backstops early exits.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{DetachError, Result};
use crate::parser::mbox::{scan_messages, MessageSpan};

#[derive(Debug)]
pub struct MboxArchive {
    path: PathBuf,
    file: File,
    spans: Vec<MessageSpan>,
    replaced: BTreeMap<usize, Vec<u8>>,
    locked: bool,
}

impl MboxArchive {
    /// Open an archive and acquire its exclusive lock.
    ///
    /// Fails with [`DetachError::ArchiveLocked`] if another process (or
    /// another handle) already holds the lock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| DetachError::io(&path, e))?;

        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                DetachError::ArchiveLocked(path.clone())
            } else {
                DetachError::io(&path, e)
            }
        })?;

        let spans = scan_messages(&path)?;
        debug!(path = %path.display(), messages = spans.len(), "Opened archive");

        Ok(Self {
            path,
            file,
            spans,
            replaced: BTreeMap::new(),
            locked: true,
        })
    }

    /// Number of messages in the archive.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Read the raw bytes of the message under `key`, without its `From `
    /// separator line. Keys are `0..len()` in file order.
    pub fn read_message(&mut self, key: usize) -> Result<Vec<u8>> {
        let span = self.spans[key];
        self.read_range(span.offset + span.sep_len, span.len - span.sep_len)
    }

    /// Stage a replacement for the message under `key`. The separator line
    /// is preserved; `body` replaces everything after it.
    pub fn replace(&mut self, key: usize, body: Vec<u8>) {
        self.replaced.insert(key, body);
    }

    /// Commit staged replacements to disk.
    ///
    /// No-op when nothing was replaced. Message spans are invalidated by a
    /// successful flush; the archive is expected to be closed afterwards.
    pub fn flush(&mut self) -> Result<()> {
        if self.replaced.is_empty() {
            return Ok(());
        }

        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DetachError::io(dir, e))?;

        let spans = self.spans.clone();
        let replaced = std::mem::take(&mut self.replaced);
        for (key, span) in spans.iter().enumerate() {
            match replaced.get(&key) {
                Some(body) => {
                    let separator = self.read_range(span.offset, span.sep_len)?;
                    tmp.write_all(&separator)
                        .and_then(|()| tmp.write_all(body))
                        .map_err(|e| DetachError::io(&self.path, e))?;
                    if !body.ends_with(b"\n") {
                        tmp.write_all(b"\n")
                            .map_err(|e| DetachError::io(&self.path, e))?;
                    }
                }
                None => self.copy_span(&mut tmp, *span)?,
            }
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| DetachError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| DetachError::io(&self.path, e.error))?;
        debug!(path = %self.path.display(), "Flushed archive");
        Ok(())
    }

    /// Release the lock and close the archive.
    pub fn close(mut self) -> Result<()> {
        self.unlock()
    }

    fn unlock(&mut self) -> Result<()> {
        if self.locked {
            self.locked = false;
            FileExt::unlock(&self.file).map_err(|e| DetachError::io(&self.path, e))?;
        }
        Ok(())
    }

    fn read_range(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DetachError::io(&self.path, e))?;
        let mut buf = vec![0u8; len as usize];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| DetachError::io(&self.path, e))?;
        Ok(buf)
    }

    fn copy_span(&mut self, out: &mut impl Write, span: MessageSpan) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(span.offset))
            .map_err(|e| DetachError::io(&self.path, e))?;
        let mut remaining = span.len as usize;
        let mut buf = [0u8; 64 * 1024];
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            self.file
                .read_exact(&mut buf[..chunk])
                .map_err(|e| DetachError::io(&self.path, e))?;
            out.write_all(&buf[..chunk])
                .map_err(|e| DetachError::io(&self.path, e))?;
            remaining -= chunk;
        }
        Ok(())
    }
}

impl Drop for MboxArchive {
    fn drop(&mut self) {
        let _ = self.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_archive(dir: &Path) -> PathBuf {
        let path = dir.join("test.mbox");
        let mut file = File::create(&path).unwrap();
        file.write_all(
            b"From a@b.c Thu Jan  1 00:00:00 2024\nSubject: one\n\nbody one\n\n\
              From d@e.f Thu Jan  2 00:00:00 2024\nSubject: two\n\nbody two\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_open_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_archive(dir.path());
        let mut archive = MboxArchive::open(&path).unwrap();
        assert_eq!(archive.len(), 2);
        let first = archive.read_message(0).unwrap();
        assert!(first.starts_with(b"Subject: one"));
        archive.close().unwrap();
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_archive(dir.path());
        let archive = MboxArchive::open(&path).unwrap();
        let err = MboxArchive::open(&path).unwrap_err();
        assert!(matches!(err, DetachError::ArchiveLocked(_)));
        archive.close().unwrap();
    }

    #[test]
    fn test_close_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_archive(dir.path());
        let archive = MboxArchive::open(&path).unwrap();
        archive.close().unwrap();
        let reopened = MboxArchive::open(&path).unwrap();
        reopened.close().unwrap();
    }

    #[test]
    fn test_flush_without_replacements_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_archive(dir.path());
        let before = std::fs::read(&path).unwrap();
        let mut archive = MboxArchive::open(&path).unwrap();
        archive.flush().unwrap();
        archive.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_replace_and_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_archive(dir.path());
        let mut archive = MboxArchive::open(&path).unwrap();
        archive.replace(0, b"Subject: rewritten\n\nnew body\n\n".to_vec());
        archive.flush().unwrap();
        archive.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("From a@b.c"));
        assert!(contents.contains("Subject: rewritten"));
        assert!(!contents.contains("body one"));
        // Untouched message copied verbatim
        assert!(contents.contains("Subject: two\n\nbody two\n"));

        // Still a valid two-message archive
        let mut reopened = MboxArchive::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        let second = reopened.read_message(1).unwrap();
        assert!(second.starts_with(b"Subject: two"));
        reopened.close().unwrap();
    }
}
