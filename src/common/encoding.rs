//! Character set handling for XML manifests.
//!
//! Encryption manifests produced by older authoring tools are not always UTF-8.
//! The document is decoded with the charset it announces (byte order mark first,
//! then the `encoding` pseudo-attribute of the XML declaration), falling back to
//! UTF-8 when neither is present.

use crate::common::{Error, Result};
use encoding_rs::Encoding;
use std::borrow::Cow;

/// Extract the `encoding` label from an XML declaration.
///
/// Only the ASCII-compatible prefix of the document is inspected, so this
/// returns `None` for documents without a declaration, for declarations
/// without an `encoding` pseudo-attribute, and for UTF-16 documents (which
/// are recognised by their byte order mark instead).
///
/// # Examples
/// ```
/// use pubpack::common::encoding::declared_encoding;
///
/// let doc = br#"<?xml version="1.0" encoding="ISO-8859-1"?><encryption/>"#;
/// assert_eq!(declared_encoding(doc), Some("ISO-8859-1"));
/// assert_eq!(declared_encoding(b"<encryption/>"), None);
/// ```
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    if !bytes.starts_with(b"<?xml") {
        return None;
    }

    let end = memchr::memmem::find(bytes, b"?>")?;
    let decl = std::str::from_utf8(&bytes[..end]).ok()?;

    let after_key = &decl[decl.find("encoding")? + "encoding".len()..];
    let after_eq = after_key.trim_start().strip_prefix('=')?.trim_start();
    let quote = after_eq.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after_eq[1..];
    let close = value.find(quote)?;
    Some(&value[..close])
}

/// Resolve the charset a document is written in.
///
/// Returns the encoding along with the length of the byte order mark to skip.
///
/// # Errors
/// Returns [`Error::FormatError`] when the declared label is unknown.
pub fn resolve_encoding(bytes: &[u8]) -> Result<(&'static Encoding, usize)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return Ok((encoding, bom_len));
    }

    match declared_encoding(bytes) {
        Some(label) => {
            let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                Error::FormatError(format!("unsupported charset '{}'", label))
            })?;
            // A declaration readable as ASCII cannot belong to a UTF-16 document
            Ok((encoding.output_encoding(), 0))
        },
        None => Ok((encoding_rs::UTF_8, 0)),
    }
}

/// Decode an XML document into UTF-8 text using its declared charset.
///
/// Borrows the input when it is already valid UTF-8 without a byte order mark.
///
/// # Errors
/// Returns [`Error::FormatError`] if the charset cannot be resolved or the
/// bytes are not valid in that charset. Malformed input is never replaced
/// with U+FFFD.
///
/// # Examples
/// ```
/// use pubpack::common::encoding::decode_xml_document;
///
/// let latin1 = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>caf\xe9</a>";
/// let text = decode_xml_document(latin1).unwrap();
/// assert!(text.ends_with("<a>caf\u{e9}</a>"));
/// ```
pub fn decode_xml_document(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, bom_len) = resolve_encoding(bytes)?;

    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .ok_or_else(|| {
            Error::FormatError(format!("document is not valid {}", encoding.name()))
        })
}
