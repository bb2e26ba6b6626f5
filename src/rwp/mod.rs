//! Reading-order packages: a zip archive described by `manifest.json`.
//!
//! Reading-order links are the resources subject to encryption; each one can
//! carry an inline `properties.encrypted` record. Ancillary `resources` links
//! are copied verbatim and never encrypted.
//!
//! # Example
//!
//! ```no_run
//! use pubpack::package::{PackageReader, PackageWriter, Resource};
//! use pubpack::rwp::RwpReader;
//!
//! let reader = RwpReader::open("book.rwpp")?;
//! let output = std::fs::File::create("book.lcp.rwpp")?;
//! let mut writer = reader.new_writer(output)?;
//! for resource in reader.resources() {
//!     resource.copy_to(&mut *writer)?;
//! }
//! writer.close()?;
//! # Ok::<(), pubpack::Error>(())
//! ```

mod builder;
pub mod manifest;
mod reader;
mod writer;

pub use builder::{PDF_CONTENT_TYPE, PDF_ENTRY_NAME, build_from_document, build_rwpp_from_pdf};
pub use manifest::{Encrypted, Link, Properties, Publication};
pub use reader::{RwpReader, RwpResource};
pub use writer::RwpWriter;

/// Location of the publication manifest inside a package.
pub const MANIFEST_LOCATION: &str = "manifest.json";

/// Location of a W3C publication manifest, when the package carries one.
pub const W3C_MANIFEST_LOCATION: &str = "publication.json";

/// Standalone manifests copied untouched into every destination package.
pub const VERBATIM_FILES: &[&str] =
    &[crate::xmlenc::ENCRYPTION_MANIFEST_LOCATION, W3C_MANIFEST_LOCATION];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Error, PackConfig};
    use crate::package::{PackageReader, PackageWriter, Resource, StorageMethod};
    use proptest::prelude::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const SOURCE_MANIFEST: &str = r#"{
        "@context": "https://readium.org/webpub-manifest/context.jsonld",
        "metadata": {"title": "Sample"},
        "readingOrder": [
            {"href": "a.html", "type": "text/html"},
            {"href": "b.html", "type": "text/html"}
        ],
        "resources": [{"href": "styles.css", "type": "text/css"}]
    }"#;

    fn container(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn sample_source() -> Vec<u8> {
        container(&[
            ("a.html", b"<html>a</html>"),
            ("b.html", b"<html>b</html>"),
            ("styles.css", b"body { margin: 0 }"),
            (MANIFEST_LOCATION, SOURCE_MANIFEST.as_bytes()),
        ])
    }

    fn open(bytes: Vec<u8>) -> RwpReader<Cursor<Vec<u8>>> {
        RwpReader::from_reader(Cursor::new(bytes), PackConfig::default()).unwrap()
    }

    /// Stand-in for the external cipher: reverses the bytes.
    fn encrypt_to(resource: &dyn Resource, writer: &mut dyn PackageWriter) -> crate::Result<()> {
        let mut source = resource.open()?;
        let mut plain = Vec::new();
        std::io::Read::read_to_end(&mut source, &mut plain)?;
        source.close()?;
        plain.reverse();

        let mut entry =
            writer.new_file(resource.path(), resource.content_type(), StorageMethod::Stored)?;
        entry.write_all(&plain)?;
        entry.finish()?;
        writer.mark_as_encrypted(resource.path(), resource.size(), "basic", "AES-CBC")
    }

    #[test]
    fn test_encrypt_one_copy_one() {
        let reader = open(sample_source());
        let mut destination = Cursor::new(Vec::new());
        let mut writer = reader.new_writer(&mut destination).unwrap();
        for resource in reader.resources() {
            if resource.path() == "a.html" {
                encrypt_to(&*resource, &mut *writer).unwrap();
            } else {
                resource.copy_to(&mut *writer).unwrap();
            }
        }
        writer.close().unwrap();

        let result = open(destination.into_inner());
        assert_eq!(result.file_count(), 4);

        let order = &result.manifest().reading_order;
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].href, "a.html");
        let encrypted = order[0].encrypted().unwrap();
        assert_eq!(encrypted.scheme, "http://readium.org/2014/01/lcp");
        assert_eq!(encrypted.profile, "basic");
        assert_eq!(encrypted.algorithm, "AES-CBC");
        assert_eq!(order[1].href, "b.html");
        assert!(!order[1].is_encrypted());

        assert_eq!(result.manifest().resources, reader.manifest().resources);
        assert!(!result.manifest().resources[0].is_encrypted());
        let css = result.read_file("styles.css").unwrap();
        assert_eq!(css, reader.read_file("styles.css").unwrap());
        assert_eq!(result.read_file("b.html").unwrap(), b"<html>b</html>");
        assert_eq!(result.read_file("a.html").unwrap(), b">lmth/<a>lmth<");
    }

    #[test]
    fn test_resources_report_existing_encryption() {
        let manifest = r#"{"metadata": {}, "readingOrder": [
            {"href": "a.html", "type": "text/html",
             "properties": {"encrypted": {"scheme": "s", "profile": "p", "algorithm": "a"}}},
            {"href": "b.html", "type": "text/html"}]}"#;
        let reader = open(container(&[
            ("a.html", b"x"),
            ("b.html", b"y"),
            (MANIFEST_LOCATION, manifest.as_bytes()),
        ]));
        let flags: Vec<_> = reader.resources().map(|r| r.is_encrypted()).collect();
        assert_eq!(flags, [true, false]);
        // Restartable
        assert_eq!(reader.resources().count(), 2);
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let bytes = container(&[("a.html", b"x")]);
        let err = RwpReader::from_reader(Cursor::new(bytes), PackConfig::default())
            .err()
            .unwrap();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("could not find manifest manifest.json"));
    }

    #[test]
    fn test_undecodable_manifest_is_format_error() {
        let bytes = container(&[(MANIFEST_LOCATION, b"{ not json")]);
        let err = RwpReader::from_reader(Cursor::new(bytes), PackConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::FormatError(_)));
    }

    #[test]
    fn test_reading_order_entry_missing_from_archive() {
        let manifest = r#"{"metadata": {}, "readingOrder": [{"href": "ghost.html", "type": "text/html"}]}"#;
        let reader = open(container(&[(MANIFEST_LOCATION, manifest.as_bytes())]));
        let resource = reader.resources().next().unwrap();
        assert!(resource.open().err().unwrap().is_not_found());

        let mut writer = reader.new_writer(Cursor::new(Vec::new())).unwrap();
        assert!(resource.copy_to(&mut *writer).unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_ancillary_resource_is_not_found() {
        let manifest = r#"{"metadata": {}, "readingOrder": [], "resources": [{"href": "gone.css", "type": "text/css"}]}"#;
        let reader = open(container(&[(MANIFEST_LOCATION, manifest.as_bytes())]));
        let err = reader.new_writer(Cursor::new(Vec::new())).err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_standalone_manifests_copied_verbatim() {
        let encryption: &[u8] = br#"<?xml version="1.0"?><encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"/>"#;
        let w3c: &[u8] = br#"{"type": "Book", "name": "Sample"}"#;
        let mut entries: Vec<(&str, &[u8])> = vec![
            (crate::xmlenc::ENCRYPTION_MANIFEST_LOCATION, encryption),
            (W3C_MANIFEST_LOCATION, w3c),
        ];
        let source = sample_source();
        let sample = open(source);
        let a = sample.read_file("a.html").unwrap();
        let b = sample.read_file("b.html").unwrap();
        let css = sample.read_file("styles.css").unwrap();
        entries.extend([
            ("a.html", a.as_slice()),
            ("b.html", b.as_slice()),
            ("styles.css", css.as_slice()),
            (MANIFEST_LOCATION, SOURCE_MANIFEST.as_bytes()),
        ]);
        let reader = open(container(&entries));

        let mut destination = Cursor::new(Vec::new());
        let writer = reader.new_writer(&mut destination).unwrap();
        writer.close().unwrap();

        let result = open(destination.into_inner());
        let copied = result.read_file(crate::xmlenc::ENCRYPTION_MANIFEST_LOCATION).unwrap();
        assert_eq!(copied, encryption);
        assert_eq!(result.read_file(W3C_MANIFEST_LOCATION).unwrap(), w3c);
        assert!(result.manifest().reading_order.is_empty());
    }

    proptest! {
        #[test]
        fn prop_reading_order_matches_calls(
            entries in prop::collection::btree_map("[a-z]{1,8}\\.x?html", any::<bool>(), 0..12)
        ) {
            let destination = Cursor::new(Vec::new());
            let mut writer =
                RwpWriter::new(destination, Publication::default(), PackConfig::default());
            for (path, encrypt) in &entries {
                let mut entry =
                    writer.new_file(path, "text/html", StorageMethod::Deflated).unwrap();
                entry.write_all(path.as_bytes()).unwrap();
                entry.finish().unwrap();
                if *encrypt {
                    writer.mark_as_encrypted(path, path.len() as u64, "basic", "AES-CBC").unwrap();
                }
            }

            let result = open(writer.finish().unwrap().into_inner());
            let order = &result.manifest().reading_order;
            prop_assert_eq!(order.len(), entries.len());
            for (link, (path, encrypt)) in order.iter().zip(&entries) {
                prop_assert_eq!(&link.href, path);
                prop_assert_eq!(link.is_encrypted(), *encrypt);
            }
        }
    }
}
