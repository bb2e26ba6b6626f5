//! Build a single-document package from scratch.

use super::manifest::Publication;
use super::writer::RwpWriter;
use crate::common::{PackConfig, Result};
use crate::package::{PackageWriter, StorageMethod};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Entry name of the embedded document in a PDF package.
pub const PDF_ENTRY_NAME: &str = "publication.pdf";

/// Media type of the embedded document in a PDF package.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const MANIFEST_SKELETON: &str = r#"{
  "@context": ["https://readium.org/webpub-manifest/context.jsonld"],
  "metadata": {"title": {{title}}},
  "readingOrder": []
}"#;

/// Create a package holding `document` as its only reading-order entry.
///
/// # Arguments
///
/// * `title` - Publication title, stored as given
/// * `document` - Content of the single entry
/// * `destination` - Seekable output for the package
/// * `entry_name` - Path of the entry inside the package
/// * `content_type` - Media type recorded for the entry
///
/// # Returns
///
/// The destination, positioned after the finished archive. No encryption
/// metadata is written.
pub fn build_from_document<D: Read, W: Write + Seek>(
    title: &str,
    mut document: D,
    destination: W,
    entry_name: &str,
    content_type: &str,
) -> Result<W> {
    // JSON-escaped, so quotes and control characters cannot break the skeleton
    let title = serde_json::to_string(title)?;
    let manifest: Publication =
        serde_json::from_str(&MANIFEST_SKELETON.replace("{{title}}", &title))?;

    let mut writer = RwpWriter::new(destination, manifest, PackConfig::default());
    let mut entry = writer.new_file(entry_name, content_type, StorageMethod::Deflated)?;
    let bytes = std::io::copy(&mut document, &mut entry)?;
    entry.finish()?;
    tracing::debug!(entry_name, bytes, "embedded document");

    writer.finish()
}

/// Wrap a PDF file into a package at `output_path`.
pub fn build_rwpp_from_pdf<P: AsRef<Path>, Q: AsRef<Path>>(
    title: &str,
    input_path: P,
    output_path: Q,
) -> Result<()> {
    let input = BufReader::new(File::open(input_path.as_ref())?);
    let output = BufWriter::new(File::create(output_path.as_ref())?);

    let mut output = build_from_document(title, input, output, PDF_ENTRY_NAME, PDF_CONTENT_TYPE)?;
    output.flush()?;
    Ok(())
}
