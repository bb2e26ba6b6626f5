//! Destination side of a reading-order package.

use super::MANIFEST_LOCATION;
use super::manifest::{Encrypted, Link, Publication};
use crate::common::{PackConfig, Result};
use crate::package::{
    EntrySink, EntryWriter, PackageWriter, StagedEntry, StorageMethod, abandoned_error,
    close_outcome, unmatched_mark,
};
use std::io::{self, Seek, Write};
use zip::ZipWriter;

/// Writes entries into a zip archive and keeps the outgoing manifest.
///
/// Every finished entry is appended to the reading order, in write order.
/// An entry whose path matches a link of the source reading order keeps that
/// link's extra members and non-encryption properties.
/// The manifest is written as the final entry by [`RwpWriter::finish`].
pub struct RwpWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    manifest: Publication,
    source_links: Vec<Link>,
    config: PackConfig,
    abandoned: Option<String>,
}

impl<W: Write + Seek> RwpWriter<W> {
    /// Start a new package on `destination`.
    ///
    /// `manifest` is used as the starting point of the outgoing manifest. Its
    /// reading order is moved aside and only consulted to carry link members
    /// over to rewritten entries.
    pub fn new(destination: W, manifest: Publication, config: PackConfig) -> Self {
        Self::from_zip_writer(ZipWriter::new(destination), manifest, config)
    }

    pub(crate) fn from_zip_writer(
        zip: ZipWriter<W>,
        mut manifest: Publication,
        config: PackConfig,
    ) -> Self {
        let source_links = std::mem::take(&mut manifest.reading_order);
        Self {
            zip,
            manifest,
            source_links,
            config,
            abandoned: None,
        }
    }

    /// Outgoing link for a committed entry.
    fn link_for(&self, entry: StagedEntry) -> Link {
        match self.source_links.iter().find(|link| link.href == entry.path) {
            Some(source) => source.carried_over(entry.content_type),
            None => Link::new(entry.path, entry.content_type),
        }
    }

    /// The outgoing manifest as it stands
    pub fn manifest(&self) -> &Publication {
        &self.manifest
    }

    fn write_manifest(&mut self) -> Result<()> {
        self.zip
            .start_file(MANIFEST_LOCATION, StorageMethod::Deflated.file_options())?;
        serde_json::to_writer(&mut self.zip, &self.manifest)?;
        self.zip.write_all(b"\n")?;
        Ok(())
    }

    /// Write the manifest, finalize the archive and return the destination.
    ///
    /// The archive is finalized even if the manifest could not be written;
    /// the manifest error is then the one reported. A writer that abandoned
    /// an entry skips the manifest and reports [`crate::Error::InvalidState`].
    pub fn finish(mut self) -> Result<W> {
        let manifest_written = match &self.abandoned {
            Some(path) => Err(abandoned_error(path)),
            None => self.write_manifest(),
        };
        let finished = self.zip.finish();

        let destination = close_outcome(manifest_written, finished)?;
        tracing::info!(
            entries = self.manifest.reading_order.len(),
            "closed publication package"
        );
        Ok(destination)
    }
}

impl<W: Write + Seek> Write for RwpWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.zip.flush()
    }
}

impl<W: Write + Seek> EntrySink for RwpWriter<W> {
    fn commit_entry(&mut self, entry: StagedEntry) -> Result<()> {
        self.zip.flush()?;
        tracing::debug!(path = %entry.path, "committed entry");
        let link = self.link_for(entry);
        self.manifest.reading_order.push(link);
        Ok(())
    }

    fn abandon_entry(&mut self, entry: StagedEntry) {
        tracing::warn!(path = %entry.path, "entry abandoned before it was finished");
        self.abandoned.get_or_insert(entry.path);
    }
}

impl<W: Write + Seek> PackageWriter for RwpWriter<W> {
    fn new_file(
        &mut self,
        path: &str,
        content_type: &str,
        storage_method: StorageMethod,
    ) -> Result<EntryWriter<'_>> {
        if let Some(abandoned) = &self.abandoned {
            return Err(abandoned_error(abandoned));
        }
        self.zip.start_file(path, storage_method.file_options())?;
        let staged = StagedEntry::new(path, content_type, storage_method);
        Ok(EntryWriter::new(self, staged))
    }

    fn mark_as_encrypted(
        &mut self,
        path: &str,
        original_size: u64,
        profile: &str,
        algorithm: &str,
    ) -> Result<()> {
        let scheme = self.config.encryption_scheme.clone();
        match self.manifest.reading_order_link_mut(path) {
            Some(link) => {
                link.set_encrypted(Encrypted::new(scheme, profile, algorithm));
                tracing::debug!(path, original_size, profile, algorithm, "marked as encrypted");
                Ok(())
            },
            None => unmatched_mark(&self.config, path),
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.finish().map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Error, UnmatchedMark};
    use crate::package::PackageReader;
    use crate::package::testing::{CENTRAL_DIRECTORY_SIGNATURE, FailingDestination};
    use crate::rwp::RwpReader;
    use std::io::Cursor;

    fn reopen(bytes: Vec<u8>) -> RwpReader<Cursor<Vec<u8>>> {
        RwpReader::from_reader(Cursor::new(bytes), PackConfig::default()).unwrap()
    }

    fn write_entry(writer: &mut dyn PackageWriter, path: &str, body: &[u8]) {
        let mut entry = writer.new_file(path, "text/html", StorageMethod::Deflated).unwrap();
        entry.write_all(body).unwrap();
        entry.finish().unwrap();
    }

    fn writer() -> RwpWriter<Cursor<Vec<u8>>> {
        RwpWriter::new(Cursor::new(Vec::new()), Publication::default(), PackConfig::default())
    }

    #[test]
    fn test_entries_commit_in_write_order() {
        let mut writer = writer();
        write_entry(&mut writer, "b.html", b"<p>b</p>");
        write_entry(&mut writer, "a.html", b"<p>a</p>");
        writer.mark_as_encrypted("a.html", 8, "basic", "AES-CBC").unwrap();

        let reader = reopen(writer.finish().unwrap().into_inner());
        let order: Vec<_> =
            reader.manifest().reading_order.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(order, ["b.html", "a.html"]);
        assert!(!reader.manifest().reading_order[0].is_encrypted());
        let encrypted = reader.manifest().reading_order[1].encrypted().unwrap();
        assert_eq!(encrypted.scheme, crate::common::config::LCP_SCHEME);
        assert_eq!(reader.read_file("a.html").unwrap(), b"<p>a</p>");
    }

    #[test]
    fn test_mark_targets_first_matching_link() {
        let mut writer = writer();
        write_entry(&mut writer, "a.html", b"a");
        writer.manifest.reading_order.push(Link::new("a.html", "text/html"));
        writer.mark_as_encrypted("a.html", 1, "basic", "AES-CBC").unwrap();
        assert!(writer.manifest().reading_order[0].is_encrypted());
        assert!(!writer.manifest().reading_order[1].is_encrypted());
    }

    #[test]
    fn test_unmatched_mark_is_ignored_by_default() {
        let mut writer = writer();
        write_entry(&mut writer, "a.html", b"a");
        writer.mark_as_encrypted("missing.html", 0, "basic", "AES-CBC").unwrap();
        assert!(!writer.manifest().reading_order[0].is_encrypted());
    }

    #[test]
    fn test_unmatched_mark_rejected_when_configured() {
        let config = PackConfig::default().with_unmatched_mark(UnmatchedMark::Reject);
        let mut writer = RwpWriter::new(Cursor::new(Vec::new()), Publication::default(), config);
        let err = writer.mark_as_encrypted("missing.html", 0, "basic", "AES-CBC").unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_abandoned_entry_poisons_writer() {
        let mut writer = writer();
        {
            let mut entry = writer.new_file("a.html", "text/html", StorageMethod::Stored).unwrap();
            entry.write_all(b"half").unwrap();
        }
        assert!(writer.manifest().reading_order.is_empty());

        let err = writer.new_file("b.html", "text/html", StorageMethod::Stored).err().unwrap();
        assert!(err.to_string().contains("a.html"));

        let err = Box::new(writer).close().unwrap_err();
        assert!(matches!(err, Error::InvalidState(ref msg) if msg.contains("a.html")));
    }

    #[test]
    fn test_stored_entry_keeps_storage_method() {
        let mut writer = writer();
        let mut entry = writer.new_file("image.png", "image/png", StorageMethod::Stored).unwrap();
        entry.write_all(&[0x89, b'P', b'N', b'G']).unwrap();
        entry.finish().unwrap();

        let reader = reopen(writer.finish().unwrap().into_inner());
        let resource = reader.resources().next().unwrap();
        assert_eq!(resource.storage_method(), StorageMethod::Stored);
        assert_eq!(resource.content_type(), "image/png");
        assert_eq!(resource.size(), 4);
    }

    #[test]
    fn test_rewritten_entry_keeps_source_link_members() {
        let source: Publication = serde_json::from_str(
            r#"{
                "metadata": {},
                "readingOrder": [{
                    "href": "a.html",
                    "type": "text/html",
                    "title": "Chapter One",
                    "properties": {
                        "page": "left",
                        "encrypted": {
                            "scheme": "urn:old",
                            "profile": "basic",
                            "algorithm": "urn:alg"
                        }
                    }
                }]
            }"#,
        )
        .unwrap();
        let mut writer = RwpWriter::new(Cursor::new(Vec::new()), source, PackConfig::default());
        assert!(writer.manifest().reading_order.is_empty());
        write_entry(&mut writer, "a.html", b"<p>a</p>");
        write_entry(&mut writer, "new.html", b"<p>new</p>");

        let reader = reopen(writer.finish().unwrap().into_inner());
        let links = &reader.manifest().reading_order;
        assert_eq!(links[0].extra.get("title"), Some(&serde_json::json!("Chapter One")));
        let properties = links[0].properties.as_ref().unwrap();
        assert_eq!(properties.extra.get("page"), Some(&serde_json::json!("left")));
        assert!(!links[0].is_encrypted());
        assert_eq!(links[1], Link::new("new.html", "text/html"));
    }

    fn failing_writer(needle: &'static [u8]) -> RwpWriter<FailingDestination> {
        let destination = FailingDestination::refusing(needle);
        let mut writer = RwpWriter::new(destination, Publication::default(), PackConfig::default());
        write_entry(&mut writer, "a.html", b"a");
        writer
    }

    #[test]
    fn test_manifest_error_wins_over_finish_error() {
        let writer = failing_writer(MANIFEST_LOCATION.as_bytes());
        let err = Box::new(writer).close().unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.to_string() == "write 1 refused"));
    }

    #[test]
    fn test_finish_error_propagates_after_manifest_is_written() {
        let writer = failing_writer(CENTRAL_DIRECTORY_SIGNATURE);
        let err = Box::new(writer).close().unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::StorageFull));
    }
}
