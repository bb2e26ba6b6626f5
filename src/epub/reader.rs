use super::writer::EpubWriter;
use super::{
    CONTAINER_LOCATION, EPUB_MIMETYPE, MIMETYPE_LOCATION, guess_media_type, is_precompressed,
};
use crate::common::{Error, PackConfig, Result};
use crate::package::{PackageReader, PackageWriter, Resource, ResourceReader, StorageMethod};
use crate::package::archive::{EntryIndex, EntryInfo, read_entry};
use crate::xmlenc::{self, ENCRYPTION_MANIFEST_LOCATION, EncryptionManifest};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::{ZipArchive, ZipWriter};

/// An open EPUB container.
pub struct EpubReader<R> {
    archive: RefCell<ZipArchive<R>>,
    index: EntryIndex,
    encryption: EncryptionManifest,
    config: PackConfig,
}

impl EpubReader<BufReader<File>> {
    /// Open an EPUB file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), PackConfig::default())
    }
}

impl<R: Read + Seek> EpubReader<R> {
    pub fn from_reader(reader: R, config: PackConfig) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Self::from_zip_archive(archive, config)
    }

    /// Open an EPUB from an already parsed archive.
    ///
    /// # Errors
    /// [`Error::NotFound`] without `META-INF/container.xml`;
    /// [`Error::FormatError`] if an existing encryption manifest is malformed.
    pub fn from_zip_archive(mut archive: ZipArchive<R>, config: PackConfig) -> Result<Self> {
        let index = EntryIndex::build(&mut archive)?;
        let archive = RefCell::new(archive);

        if index.get(CONTAINER_LOCATION).is_none() {
            return Err(Error::NotFound(format!("could not find container {}", CONTAINER_LOCATION)));
        }

        let encryption = match index.get(ENCRYPTION_MANIFEST_LOCATION) {
            Some(info) => xmlenc::parse(&read_entry(&archive, info)?)?,
            None => EncryptionManifest::default(),
        };
        tracing::debug!(records = encryption.len(), "opened EPUB container");

        Ok(Self {
            archive,
            index,
            encryption,
            config,
        })
    }

    /// Encryption records of the source container
    pub fn encryption(&self) -> &EncryptionManifest {
        &self.encryption
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.index.iter().map(|info| info.name.as_str())
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let info = self
            .index
            .get(path)
            .ok_or_else(|| Error::NotFound(format!("resource {} is not in the container", path)))?;
        read_entry(&self.archive, info)
    }
}

impl<R: Read + Seek> PackageReader for EpubReader<R> {
    fn resources(&self) -> Box<dyn Iterator<Item = Box<dyn Resource + '_>> + '_> {
        Box::new(
            self.index
                .iter()
                .filter(|info| {
                    info.name != MIMETYPE_LOCATION && info.name != ENCRYPTION_MANIFEST_LOCATION
                })
                .map(move |info| {
                    Box::new(EpubResource {
                        reader: self,
                        entry: info,
                        content_type: guess_media_type(&info.name),
                    }) as Box<dyn Resource + '_>
                }),
        )
    }

    fn new_writer<'w, W: Write + Seek + 'w>(
        &self,
        destination: W,
    ) -> Result<Box<dyn PackageWriter + 'w>> {
        let mut zip = ZipWriter::new(destination);
        zip.start_file(MIMETYPE_LOCATION, StorageMethod::Stored.file_options())?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;

        tracing::info!(records = self.encryption.len(), "seeded destination EPUB");
        Ok(Box::new(EpubWriter::from_zip_writer(
            zip,
            self.encryption.clone(),
            self.config.clone(),
        )))
    }
}

/// One file entry of an [`EpubReader`].
pub struct EpubResource<'a, R> {
    reader: &'a EpubReader<R>,
    entry: &'a EntryInfo,
    content_type: &'static str,
}

impl<R: Read + Seek> Resource for EpubResource<'_, R> {
    fn path(&self) -> &str {
        &self.entry.name
    }

    fn content_type(&self) -> &str {
        self.content_type
    }

    fn size(&self) -> u64 {
        self.entry.size
    }

    fn is_encrypted(&self) -> bool {
        self.reader.encryption.data_for_file(&self.entry.name).is_some()
    }

    fn can_be_encrypted(&self) -> bool {
        let name = self.entry.name.as_str();
        !(name.starts_with("META-INF/") || name.ends_with(".opf") || name.ends_with(".ncx"))
    }

    fn compress_before_encryption(&self) -> bool {
        self.entry.storage_method == StorageMethod::Deflated && !is_precompressed(self.content_type)
    }

    fn storage_method(&self) -> StorageMethod {
        self.entry.storage_method
    }

    fn open(&self) -> Result<ResourceReader<'_>> {
        let content = read_entry(&self.reader.archive, self.entry)?;
        Ok(ResourceReader::new(Cursor::new(content), self.entry.size))
    }
}
