//! Per-entry streams: the staged destination writer and the source reader.

use crate::common::{Error, Result};
use std::io::{self, Read, Write};

/// How an entry's bytes are stored in the zip container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StorageMethod {
    /// No compression
    Stored,
    /// Deflate compression
    #[default]
    Deflated,
}

impl StorageMethod {
    #[inline]
    pub(crate) fn to_zip(self) -> zip::CompressionMethod {
        match self {
            StorageMethod::Stored => zip::CompressionMethod::Stored,
            StorageMethod::Deflated => zip::CompressionMethod::Deflated,
        }
    }

    /// Zip file options for a new entry stored with this method.
    #[inline]
    pub(crate) fn file_options(self) -> zip::write::SimpleFileOptions {
        zip::write::SimpleFileOptions::default().compression_method(self.to_zip())
    }
}

impl From<zip::CompressionMethod> for StorageMethod {
    fn from(method: zip::CompressionMethod) -> Self {
        if method == zip::CompressionMethod::Stored {
            StorageMethod::Stored
        } else {
            StorageMethod::Deflated
        }
    }
}

/// Description of a destination entry that has been opened but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub path: String,
    pub content_type: String,
    pub storage_method: StorageMethod,
    /// The plaintext was deflated before it was encrypted into this entry
    pub plaintext_deflated: bool,
}

impl StagedEntry {
    pub fn new(path: &str, content_type: &str, storage_method: StorageMethod) -> Self {
        Self {
            path: path.to_string(),
            content_type: content_type.to_string(),
            storage_method,
            plaintext_deflated: false,
        }
    }
}

/// Destination side of an [`EntryWriter`], implemented by each package writer.
pub(crate) trait EntrySink: Write {
    /// Record a fully written entry in the outgoing manifest.
    fn commit_entry(&mut self, entry: StagedEntry) -> Result<()>;

    /// Called when an entry writer is dropped without being finished.
    fn abandon_entry(&mut self, entry: StagedEntry);
}

/// Write handle for one destination entry.
///
/// Bytes written go straight into the archive entry. The entry only becomes
/// part of the outgoing manifest once [`EntryWriter::finish`] returns `Ok`.
/// Dropping the writer unfinished abandons the entry, and the owning package
/// writer refuses further work.
pub struct EntryWriter<'a> {
    sink: &'a mut dyn EntrySink,
    staged: Option<StagedEntry>,
    written: u64,
}

impl<'a> EntryWriter<'a> {
    pub(crate) fn new(sink: &'a mut dyn EntrySink, staged: StagedEntry) -> Self {
        Self {
            sink,
            staged: Some(staged),
            written: 0,
        }
    }

    /// Path of the entry being written.
    pub fn path(&self) -> &str {
        self.staged.as_ref().map(|s| s.path.as_str()).unwrap_or_default()
    }

    /// Number of bytes accepted so far.
    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Record that the bytes being written are the encryption of deflated
    /// plaintext. EPUB writers turn this into a deflate compression
    /// descriptor when the entry is marked as encrypted.
    pub fn set_plaintext_deflated(&mut self, deflated: bool) {
        if let Some(staged) = self.staged.as_mut() {
            staged.plaintext_deflated = deflated;
        }
    }

    /// Close the entry and commit it to the outgoing manifest.
    pub fn finish(mut self) -> Result<()> {
        match self.staged.take() {
            Some(staged) => self.sink.commit_entry(staged),
            None => Err(Error::InvalidState("entry already finished".to_string())),
        }
    }
}

impl Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl Drop for EntryWriter<'_> {
    fn drop(&mut self) {
        if let Some(staged) = self.staged.take() {
            self.sink.abandon_entry(staged);
        }
    }
}

/// Read handle for one source entry.
///
/// Counts the bytes it yields; [`ResourceReader::close`] fails when the stream
/// reached end-of-file with a length different from the declared size.
pub struct ResourceReader<'a> {
    inner: Box<dyn Read + 'a>,
    declared_size: u64,
    read: u64,
    at_eof: bool,
}

impl<'a> ResourceReader<'a> {
    pub fn new(inner: impl Read + 'a, declared_size: u64) -> Self {
        Self {
            inner: Box::new(inner),
            declared_size,
            read: 0,
            at_eof: false,
        }
    }

    /// Release the stream, reporting a truncated or overlong entry.
    pub fn close(self) -> Result<()> {
        if self.at_eof && self.read != self.declared_size {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "entry yielded {} bytes but declares {}",
                    self.read, self.declared_size
                ),
            )));
        }
        Ok(())
    }
}

impl Read for ResourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.at_eof = true;
        }
        self.read += n as u64;
        Ok(n)
    }
}
