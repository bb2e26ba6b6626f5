//! Source side of a reading-order package.

use super::manifest::{Link, Publication};
use super::writer::RwpWriter;
use super::{MANIFEST_LOCATION, VERBATIM_FILES};
use crate::common::{Error, PackConfig, Result};
use crate::package::archive::{EntryIndex, EntryInfo, raw_copy, read_entry};
use crate::package::{PackageReader, PackageWriter, Resource, ResourceReader, StorageMethod};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::{ZipArchive, ZipWriter};

/// An open reading-order package.
///
/// The archive sits behind a `RefCell` so resources can share the reader and
/// still seek the underlying stream.
pub struct RwpReader<R> {
    archive: RefCell<ZipArchive<R>>,
    index: EntryIndex,
    manifest: Publication,
    config: PackConfig,
}

impl RwpReader<BufReader<File>> {
    /// Open a package file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), PackConfig::default())
    }
}

impl<R: Read + Seek> RwpReader<R> {
    /// Open a package from a seekable stream.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the archive has no `manifest.json`,
    /// [`Error::FormatError`] if the archive or the manifest cannot be decoded.
    pub fn from_reader(reader: R, config: PackConfig) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Self::from_zip_archive(archive, config)
    }

    /// Open a package from an already parsed archive.
    pub fn from_zip_archive(mut archive: ZipArchive<R>, config: PackConfig) -> Result<Self> {
        let index = EntryIndex::build(&mut archive)?;
        let archive = RefCell::new(archive);

        let manifest_entry = index.get(MANIFEST_LOCATION).ok_or_else(|| {
            Error::NotFound(format!("could not find manifest {}", MANIFEST_LOCATION))
        })?;
        let bytes = read_entry(&archive, manifest_entry)?;
        let manifest: Publication = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            reading_order = manifest.reading_order.len(),
            resources = manifest.resources.len(),
            "parsed publication manifest"
        );

        Ok(Self {
            archive,
            index,
            manifest,
            config,
        })
    }

    /// The parsed source manifest
    pub fn manifest(&self) -> &Publication {
        &self.manifest
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Names of all file entries, in archive order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.index.iter().map(|info| info.name.as_str())
    }

    /// Number of file entries in the archive.
    pub fn file_count(&self) -> usize {
        self.index.len()
    }

    /// Read an entry of the archive by path.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let info = self.entry(path)?;
        read_entry(&self.archive, info)
    }

    fn entry(&self, path: &str) -> Result<&EntryInfo> {
        self.index
            .get(path)
            .ok_or_else(|| Error::NotFound(format!("resource {} is not in the container", path)))
    }
}

impl<R: Read + Seek> PackageReader for RwpReader<R> {
    fn resources(&self) -> Box<dyn Iterator<Item = Box<dyn Resource + '_>> + '_> {
        Box::new(self.manifest.reading_order.iter().map(move |link| {
            Box::new(RwpResource {
                reader: self,
                link,
                entry: self.index.get(&link.href),
            }) as Box<dyn Resource + '_>
        }))
    }

    fn new_writer<'w, W: Write + Seek + 'w>(
        &self,
        destination: W,
    ) -> Result<Box<dyn PackageWriter + 'w>> {
        let mut zip = ZipWriter::new(destination);
        let mut copied = HashSet::new();

        // Standalone manifests travel untouched
        for name in VERBATIM_FILES {
            if let Some(info) = self.index.get(name) {
                raw_copy(&self.archive, info, &mut zip)?;
                copied.insert(info.name.as_str());
            }
        }

        // Ancillary resources are never encrypted
        for link in &self.manifest.resources {
            let info = self.entry(&link.href)?;
            if copied.insert(info.name.as_str()) {
                raw_copy(&self.archive, info, &mut zip)?;
            }
        }

        tracing::info!(copied = copied.len(), "seeded destination package");

        Ok(Box::new(RwpWriter::from_zip_writer(
            zip,
            self.manifest.clone(),
            self.config.clone(),
        )))
    }
}

/// One reading-order entry of an [`RwpReader`].
pub struct RwpResource<'a, R> {
    reader: &'a RwpReader<R>,
    link: &'a Link,
    entry: Option<&'a EntryInfo>,
}

impl<R> RwpResource<'_, R> {
    /// The manifest link this resource was listed under
    pub fn link(&self) -> &Link {
        self.link
    }
}

impl<R: Read + Seek> Resource for RwpResource<'_, R> {
    fn path(&self) -> &str {
        &self.link.href
    }

    fn content_type(&self) -> &str {
        &self.link.type_
    }

    fn size(&self) -> u64 {
        self.entry.map(|info| info.size).unwrap_or(0)
    }

    fn is_encrypted(&self) -> bool {
        self.link.is_encrypted()
    }

    fn can_be_encrypted(&self) -> bool {
        true
    }

    fn compress_before_encryption(&self) -> bool {
        false
    }

    fn storage_method(&self) -> StorageMethod {
        self.entry.map(|info| info.storage_method).unwrap_or_default()
    }

    fn open(&self) -> Result<ResourceReader<'_>> {
        let info = match self.entry {
            Some(info) => info,
            None => self.reader.entry(&self.link.href)?,
        };
        let content = read_entry(&self.reader.archive, info)?;
        Ok(ResourceReader::new(Cursor::new(content), info.size))
    }
}
