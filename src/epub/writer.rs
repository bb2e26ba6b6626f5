use crate::common::{Error, PackConfig, Result};
use crate::package::{
    EntrySink, EntryWriter, PackageWriter, StagedEntry, StorageMethod, abandoned_error,
    close_outcome, unmatched_mark,
};
use crate::xmlenc::{
    self, COMPRESSION_DEFLATE, COMPRESSION_NONE, ENCRYPTION_MANIFEST_LOCATION, EncryptedData,
    EncryptionManifest,
};
use std::collections::HashMap;
use std::io::{self, Seek, Write};
use zip::ZipWriter;

/// Writes EPUB entries and collects the outgoing encryption manifest.
pub struct EpubWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    encryption: EncryptionManifest,
    /// Committed entries, with whether their plaintext was deflated
    written: HashMap<String, bool>,
    config: PackConfig,
    abandoned: Option<String>,
}

impl<W: Write + Seek> EpubWriter<W> {
    pub(crate) fn from_zip_writer(
        zip: ZipWriter<W>,
        encryption: EncryptionManifest,
        config: PackConfig,
    ) -> Self {
        Self {
            zip,
            encryption,
            written: HashMap::new(),
            config,
            abandoned: None,
        }
    }

    /// The outgoing encryption manifest as it stands
    pub fn encryption(&self) -> &EncryptionManifest {
        &self.encryption
    }

    fn write_encryption_manifest(&mut self) -> Result<()> {
        if self.encryption.is_empty() {
            return Ok(());
        }
        self.zip
            .start_file(ENCRYPTION_MANIFEST_LOCATION, StorageMethod::Deflated.file_options())?;
        xmlenc::write(&mut self.zip, &self.encryption)
    }

    /// Write the encryption manifest if it has records, then finalize the archive.
    pub fn finish(mut self) -> Result<W> {
        let manifest_written = match &self.abandoned {
            Some(path) => Err(abandoned_error(path)),
            None => self.write_encryption_manifest(),
        };
        let finished = self.zip.finish();

        let destination = close_outcome(manifest_written, finished)?;
        tracing::info!(
            entries = self.written.len(),
            records = self.encryption.len(),
            "closed EPUB"
        );
        Ok(destination)
    }
}

impl<W: Write + Seek> Write for EpubWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.zip.flush()
    }
}

impl<W: Write + Seek> EntrySink for EpubWriter<W> {
    fn commit_entry(&mut self, entry: StagedEntry) -> Result<()> {
        self.zip.flush()?;
        tracing::debug!(path = %entry.path, "committed entry");
        self.written.insert(entry.path, entry.plaintext_deflated);
        Ok(())
    }

    fn abandon_entry(&mut self, entry: StagedEntry) {
        tracing::warn!(path = %entry.path, "entry abandoned before it was finished");
        self.abandoned.get_or_insert(entry.path);
    }
}

impl<W: Write + Seek> PackageWriter for EpubWriter<W> {
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

    /// Record `path` in the encryption manifest.
    ///
    /// An entry flagged with [`EntryWriter::set_plaintext_deflated`] gets a
    /// deflate compression descriptor. Otherwise a positive `original_size`
    /// is recorded under the "no compression" method. The XML dialect has no
    /// slot for `profile`. An existing record for the same resource is
    /// replaced.
    fn mark_as_encrypted(
        &mut self,
        path: &str,
        original_size: u64,
        profile: &str,
        algorithm: &str,
    ) -> Result<()> {
        let Some(&deflated) = self.written.get(path) else {
            return unmatched_mark(&self.config, path);
        };
        let uri = cipher_reference(path)?;

        let mut data = EncryptedData::new(uri, algorithm)
            .with_retrieval_method(&self.config.content_key_uri, &self.config.content_key_type);
        if deflated {
            data = data.with_compression(COMPRESSION_DEFLATE, original_size);
        } else if original_size > 0 {
            data = data.with_compression(COMPRESSION_NONE, original_size);
        }

        match self.encryption.data.iter_mut().find(|existing| existing.uri() == data.uri()) {
            Some(existing) => *existing = data,
            None => self.encryption.push(data),
        }
        tracing::debug!(path, original_size, deflated, profile, algorithm, "marked as encrypted");
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.finish().map(drop)
    }
}

/// Cipher reference URI of a container entry.
///
/// An entry name whose first segment holds a colon parses as an opaque URI
/// with no path, which would make every such entry share the empty reference.
fn cipher_reference(path: &str) -> Result<String> {
    match xmlenc::escaped_path(path) {
        Some(uri) if !uri.is_empty() => Ok(uri),
        _ => Err(Error::FormatError(format!(
            "'{}' is not a valid relative URI reference",
            path
        ))),
    }
}
