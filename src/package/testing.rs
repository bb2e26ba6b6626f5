//! Test doubles shared by the writer tests.

use std::io::{self, Cursor, Seek, SeekFrom, Write};

/// Seekable in-memory destination that refuses every write containing
/// `needle`. Refusals are numbered so a test can tell which one surfaced.
pub(crate) struct FailingDestination {
    inner: Cursor<Vec<u8>>,
    needle: &'static [u8],
    refused: usize,
}

/// Signature of a zip central directory header, only written by `finish`.
pub(crate) const CENTRAL_DIRECTORY_SIGNATURE: &[u8] = b"PK\x01\x02";

impl FailingDestination {
    pub fn refusing(needle: &'static [u8]) -> Self {
        Self {
            inner: Cursor::new(Vec::new()),
            needle,
            refused: 0,
        }
    }
}

impl Write for FailingDestination {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.windows(self.needle.len()).any(|window| window == self.needle) {
            self.refused += 1;
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                format!("write {} refused", self.refused),
            ));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for FailingDestination {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
