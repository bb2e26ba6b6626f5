//! Physical zip access shared by the container readers.

use crate::common::Result;
use crate::package::StorageMethod;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use zip::{ZipArchive, ZipWriter};

/// Name, position and stored attributes of one archive entry.
#[derive(Debug, Clone)]
pub(crate) struct EntryInfo {
    pub name: String,
    pub index: usize,
    pub size: u64,
    pub storage_method: StorageMethod,
}

/// Index of the file entries of an archive, in archive order.
#[derive(Debug, Default)]
pub(crate) struct EntryIndex {
    entries: Vec<EntryInfo>,
    by_name: HashMap<String, usize>,
}

impl EntryIndex {
    pub fn build<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let mut index = Self::default();
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if file.is_dir() {
                continue;
            }
            index.by_name.insert(file.name().to_string(), index.entries.len());
            index.entries.push(EntryInfo {
                name: file.name().to_string(),
                index: i,
                size: file.size(),
                storage_method: file.compression().into(),
            });
        }
        Ok(index)
    }

    pub fn get(&self, name: &str) -> Option<&EntryInfo> {
        self.by_name.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Upper bound on the buffer reserved ahead of reading an entry.
const PREALLOCATION_LIMIT: u64 = 1 << 20;

/// Read one entry fully into memory.
///
/// The declared size only sizes the initial buffer, up to
/// [`PREALLOCATION_LIMIT`]; the header is not trusted beyond that.
pub(crate) fn read_entry<R: Read + Seek>(
    archive: &RefCell<ZipArchive<R>>,
    info: &EntryInfo,
) -> Result<Vec<u8>> {
    let mut archive = archive.borrow_mut();
    let mut file = archive.by_index(info.index)?;
    let mut content = Vec::with_capacity(info.size.min(PREALLOCATION_LIMIT) as usize);
    file.read_to_end(&mut content)?;
    Ok(content)
}

/// Copy an entry, compressed bytes and all, into another archive.
pub(crate) fn raw_copy<R: Read + Seek, W: Write + Seek>(
    archive: &RefCell<ZipArchive<R>>,
    info: &EntryInfo,
    destination: &mut ZipWriter<W>,
) -> Result<()> {
    let mut archive = archive.borrow_mut();
    let file = archive.by_index_raw(info.index)?;
    destination.raw_copy_file(file)?;
    tracing::debug!(path = %info.name, "copied entry verbatim");
    Ok(())
}
