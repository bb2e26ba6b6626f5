//! Pick the container generation from the shape of the archive.

use crate::common::{Error, PackConfig, Result};
use crate::epub::{CONTAINER_LOCATION, EpubReader};
use crate::package::{PackageReader, PackageWriter, Resource};
use crate::rwp::{MANIFEST_LOCATION, RwpReader};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use zip::ZipArchive;

/// A source container of either generation.
pub enum Package<R> {
    /// Reading-order package with `manifest.json`
    Rwp(RwpReader<R>),
    /// EPUB with `META-INF/container.xml`
    Epub(EpubReader<R>),
}

impl<R: Read + Seek> Package<R> {
    /// Open a container, preferring the reading-order manifest when both
    /// markers are present.
    ///
    /// # Errors
    /// [`Error::FormatError`] if the archive has neither `manifest.json` nor
    /// `META-INF/container.xml`.
    pub fn from_reader(reader: R, config: PackConfig) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let is_rwp = archive.index_for_name(MANIFEST_LOCATION).is_some();
        let is_epub = archive.index_for_name(CONTAINER_LOCATION).is_some();

        if is_rwp {
            tracing::debug!("detected reading-order package");
            Ok(Package::Rwp(RwpReader::from_zip_archive(archive, config)?))
        } else if is_epub {
            tracing::debug!("detected EPUB container");
            Ok(Package::Epub(EpubReader::from_zip_archive(archive, config)?))
        } else {
            Err(Error::FormatError(format!(
                "archive has neither {} nor {}",
                MANIFEST_LOCATION, CONTAINER_LOCATION
            )))
        }
    }

    /// Short name of the container generation
    pub fn kind(&self) -> &'static str {
        match self {
            Package::Rwp(_) => "rwp",
            Package::Epub(_) => "epub",
        }
    }
}

/// Open a container file of either generation.
pub fn open_package<P: AsRef<Path>>(
    path: P,
    config: PackConfig,
) -> Result<Package<BufReader<File>>> {
    let file = File::open(path.as_ref())?;
    Package::from_reader(BufReader::new(file), config)
}

impl<R: Read + Seek> PackageReader for Package<R> {
    fn resources(&self) -> Box<dyn Iterator<Item = Box<dyn Resource + '_>> + '_> {
        match self {
            Package::Rwp(reader) => reader.resources(),
            Package::Epub(reader) => reader.resources(),
        }
    }

    fn new_writer<'w, W: Write + Seek + 'w>(
        &self,
        destination: W,
    ) -> Result<Box<dyn PackageWriter + 'w>> {
        match self {
            Package::Rwp(reader) => reader.new_writer(destination),
            Package::Epub(reader) => reader.new_writer(destination),
        }
    }
}
