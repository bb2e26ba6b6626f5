//! pubpack - re-packaging of zip-based digital publications
//!
//! This library reads a publication container, hands its resources to a
//! caller-supplied encryption driver, and writes a destination container whose
//! manifest records which resources are encrypted and how.
//!
//! # Features
//!
//! - **Reading-order packages**: `manifest.json` with inline encryption properties
//! - **EPUB containers**: cipher-data records in `META-INF/encryption.xml`
//! - **XML encryption manifest codec**: charset-aware reading, indented UTF-8 writing
//! - **Verbatim copies**: ancillary resources and standalone manifests are copied
//!   without recompression
//! - **Two-phase entries**: an entry joins the manifest only once it is fully written
//!
//! # Example - Re-packaging a publication
//!
//! ```no_run
//! use pubpack::package::{PackageReader, PackageWriter, Resource, open_package};
//! use pubpack::PackConfig;
//!
//! const AES_256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
//!
//! # fn main() -> pubpack::Result<()> {
//! let source = open_package("book.rwpp", PackConfig::default())?;
//! let output = std::fs::File::create("book.protected.rwpp")?;
//! let mut writer = source.new_writer(output)?;
//!
//! for resource in source.resources() {
//!     if resource.is_encrypted() || !resource.can_be_encrypted() {
//!         resource.copy_to(&mut *writer)?;
//!         continue;
//!     }
//!     // Encrypt the resource content into a new entry
//!     let mut entry =
//!         writer.new_file(resource.path(), resource.content_type(), resource.storage_method())?;
//!     let mut plain = resource.open()?;
//!     std::io::copy(&mut plain, &mut entry)?; // stand-in for the cipher
//!     plain.close()?;
//!     entry.finish()?;
//!     writer.mark_as_encrypted(resource.path(), resource.size(), "basic", AES_256_CBC)?;
//! }
//!
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Wrapping a PDF
//!
//! ```no_run
//! # fn main() -> pubpack::Result<()> {
//! pubpack::rwp::build_rwpp_from_pdf("Annual Report", "report.pdf", "report.rwpp")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Packaging passes emit [`tracing`] events; the library installs no subscriber.

pub mod common;
pub mod epub;
pub mod package;
pub mod rwp;
pub mod xmlenc;

pub use common::{Error, PackConfig, Result, UnmatchedMark};
pub use package::{
    EntryWriter, Package, PackageReader, PackageWriter, Resource, ResourceReader, StorageMethod,
    open_package,
};
