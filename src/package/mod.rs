//! Container-generation independent packaging abstractions.
//!
//! A packaging pass has three participants:
//!
//! - a [`PackageReader`] bound to the source container,
//! - the [`Resource`] views it hands out, one per reading-order entry,
//! - the [`PackageWriter`] it seeds for the destination container.
//!
//! The driver (outside this crate) walks the resources and, for each one,
//! either calls [`Resource::copy_to`] or streams an encrypted rendition through
//! [`PackageWriter::new_file`] and then calls
//! [`PackageWriter::mark_as_encrypted`]. Closing the writer commits the
//! manifest.
//!
//! Each container generation provides its own implementation: the JSON
//! reading-order package in [`crate::rwp`] and the EPUB package in
//! [`crate::epub`]. [`Package`] picks one by looking at the container.

pub(crate) mod archive;
mod detect;
mod entry;
#[cfg(test)]
pub(crate) mod testing;

pub use detect::{Package, open_package};
pub use entry::{EntryWriter, ResourceReader, StagedEntry, StorageMethod};
pub(crate) use entry::EntrySink;

use crate::common::{Error, PackConfig, Result, UnmatchedMark};
use std::io::{Seek, Write};

/// Read-only view of one entry inside an open source container.
pub trait Resource {
    /// Path of the entry inside the container
    fn path(&self) -> &str;

    /// Declared media type
    fn content_type(&self) -> &str;

    /// Declared uncompressed size in bytes
    fn size(&self) -> u64;

    /// Whether the source manifest already records this entry as encrypted
    fn is_encrypted(&self) -> bool;

    /// Whether the entry may be encrypted at all
    fn can_be_encrypted(&self) -> bool;

    /// Whether the entry should be compressed before it is encrypted
    fn compress_before_encryption(&self) -> bool;

    /// How the entry is stored in the source container
    fn storage_method(&self) -> StorageMethod;

    /// Open the entry's uncompressed bytes.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the container has no such entry, [`Error::Io`]
    /// if it cannot be read.
    fn open(&self) -> Result<ResourceReader<'_>>;

    /// Copy the entry unchanged into `writer`, under the same path, content
    /// type and storage method.
    ///
    /// Both streams are released on every path. When several steps fail,
    /// the transfer error is reported first, then a source close error, then
    /// a destination close error.
    fn copy_to(&self, writer: &mut dyn PackageWriter) -> Result<()> {
        let mut destination =
            writer.new_file(self.path(), self.content_type(), self.storage_method())?;
        let mut source = self.open()?;

        let transferred = std::io::copy(&mut source, &mut destination);
        let source_closed = source.close();

        match transferred {
            Err(e) => {
                // An unfinished entry is never committed to the manifest
                drop(destination);
                Err(Error::Io(e))
            },
            Ok(bytes) => {
                let destination_closed = destination.finish();
                tracing::debug!(path = self.path(), bytes, "copied resource");
                source_closed?;
                destination_closed
            },
        }
    }
}

/// Destination side of a packaging pass.
pub trait PackageWriter {
    /// Open a new destination entry.
    ///
    /// The entry is staged: it joins the outgoing manifest as an unencrypted
    /// `{href: path, type: content_type}` link only once the returned writer
    /// is finished.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if an earlier entry was abandoned.
    fn new_file(
        &mut self,
        path: &str,
        content_type: &str,
        storage_method: StorageMethod,
    ) -> Result<EntryWriter<'_>>;

    /// Record that the committed entry at `path` holds encrypted content.
    ///
    /// # Errors
    /// With [`UnmatchedMark::Reject`], [`Error::InvalidState`] if no committed
    /// entry has this path.
    fn mark_as_encrypted(
        &mut self,
        path: &str,
        original_size: u64,
        profile: &str,
        algorithm: &str,
    ) -> Result<()>;

    /// Write the outgoing manifest and finalize the archive.
    ///
    /// A manifest failure takes precedence over an archive failure; the
    /// archive is finalized in either case.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Source side of a packaging pass.
pub trait PackageReader {
    /// Resources subject to the pass, in manifest order.
    ///
    /// The iterator is lazy; calling this again starts over.
    fn resources(&self) -> Box<dyn Iterator<Item = Box<dyn Resource + '_>> + '_>;

    /// Seed a destination container and return a writer bound to it.
    fn new_writer<'w, W: Write + Seek + 'w>(
        &self,
        destination: W,
    ) -> Result<Box<dyn PackageWriter + 'w>>;
}

/// Apply the configured policy to a mark that matched no committed entry.
pub(crate) fn unmatched_mark(config: &PackConfig, path: &str) -> Result<()> {
    match config.unmatched_mark {
        UnmatchedMark::Ignore => {
            tracing::warn!(path, "mark_as_encrypted matched no written entry; ignored");
            Ok(())
        },
        UnmatchedMark::Reject => Err(Error::InvalidState(format!(
            "cannot mark '{}' as encrypted: no entry was written at that path",
            path
        ))),
    }
}

/// Combine the manifest write with the archive finalization that always
/// follows it. The manifest error wins when both fail.
pub(crate) fn close_outcome<W>(
    manifest_written: Result<()>,
    finished: zip::result::ZipResult<W>,
) -> Result<W> {
    manifest_written?;
    Ok(finished?)
}

/// Error reported once a writer has abandoned an entry.
pub(crate) fn abandoned_error(path: &str) -> Error {
    Error::InvalidState(format!(
        "entry '{}' was opened but never finished; the destination is unusable",
        path
    ))
}
