//! XML encryption manifest (`META-INF/encryption.xml`) codec.
//!
//! This is the legacy, standalone dialect for recording which resources of a
//! container are encrypted: a list of W3C XML Encryption `EncryptedData`
//! records keyed by the escaped URI of the protected resource. It is a pure
//! parse/serialize leaf with no knowledge of container layout.
//!
//! - [`read`] decodes documents in their declared charset before parsing.
//! - [`write`] always re-serializes as indented UTF-8.
//! - [`EncryptionManifest::data_for_file`] looks records up by exact escaped path.
//!
//! # Example
//!
//! ```
//! use pubpack::xmlenc::{self, EncryptedData, EncryptionManifest};
//!
//! let mut manifest = EncryptionManifest::default();
//! let aes_cbc = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
//! manifest.push(EncryptedData::new("OEBPS/chapter%201.xhtml", aes_cbc));
//!
//! let mut out = Vec::new();
//! xmlenc::write(&mut out, &manifest)?;
//! let parsed = xmlenc::read(out.as_slice())?;
//! assert!(parsed.data_for_file("OEBPS/chapter 1.xhtml").is_some());
//! # Ok::<(), pubpack::Error>(())
//! ```

mod model;
mod reader;
mod uri;
mod writer;

pub use model::*;
pub use reader::{parse, parse_str, read};
pub use uri::escaped_path;
pub use writer::{XML_HEADER, to_xml, write};

/// Location of the encryption manifest inside a container.
pub const ENCRYPTION_MANIFEST_LOCATION: &str = "META-INF/encryption.xml";

/// Namespace of the `encryption` root element.
pub const NS_CONTAINER: &str = "urn:oasis:names:tc:opendocument:xmlns:container";
/// W3C XML Encryption namespace.
pub const NS_XMLENC: &str = "http://www.w3.org/2001/04/xmlenc#";
/// W3C XML Signature namespace (KeyInfo).
pub const NS_XMLDSIG: &str = "http://www.w3.org/2000/09/xmldsig#";
/// IDPF compression descriptor namespace.
pub const NS_COMPRESSION: &str = "http://www.idpf.org/2016/encryption#compression";

impl EncryptionManifest {
    /// Return the record whose cipher reference equals the escaped path of `path`.
    ///
    /// `path` is parsed as a URI reference and compared by exact string
    /// equality against each record's stored URI; the first match wins.
    /// Equivalent but differently escaped URIs are distinct, and a `path`
    /// that cannot be parsed matches nothing.
    pub fn data_for_file(&self, path: &str) -> Option<&EncryptedData> {
        let uri = escaped_path(path)?;
        self.data.iter().find(|datum| datum.uri() == uri)
    }

    /// Append a record.
    pub fn push(&mut self, data: EncryptedData) {
        self.data.push(data);
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the manifest has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Serialize as indented UTF-8 XML.
    pub fn to_xml(&self) -> String {
        writer::to_xml(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"
            xmlns:enc="http://www.w3.org/2001/04/xmlenc#"
            xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
  <enc:EncryptedData Id="ed1">
    <enc:EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#aes256-cbc">
      <enc:KeySize>256</enc:KeySize>
    </enc:EncryptionMethod>
    <ds:KeyInfo>
      <ds:RetrievalMethod URI="license.lcpl#/encryption/content_key" Type="http://readium.org/2014/01/lcp#EncryptedContentKey"/>
    </ds:KeyInfo>
    <enc:CipherData>
      <enc:CipherReference URI="OEBPS/chapter%201.xhtml"/>
    </enc:CipherData>
    <enc:EncryptionProperties>
      <enc:EncryptionProperty xmlns:c="http://www.idpf.org/2016/encryption#compression">
        <c:Compression Method="8" OriginalLength="4096"/>
      </enc:EncryptionProperty>
    </enc:EncryptionProperties>
  </enc:EncryptedData>
  <enc:EncryptedData>
    <enc:EncryptionMethod Algorithm="http://www.idpf.org/2008/embedding"/>
    <enc:CipherData>
      <enc:CipherReference URI="OEBPS/fonts/serif.otf"/>
    </enc:CipherData>
  </enc:EncryptedData>
</encryption>
"#;

    #[test]
    fn test_parse_sample() {
        let manifest = parse_str(SAMPLE).unwrap();
        assert_eq!(manifest.len(), 2);

        let first = &manifest.data[0];
        assert_eq!(first.id.as_deref(), Some("ed1"));
        assert_eq!(first.method.key_size, Some(256));
        assert_eq!(first.uri(), "OEBPS/chapter%201.xhtml");
        let retrieval = first.key_info.as_ref().unwrap().retrieval_method.as_ref().unwrap();
        assert_eq!(retrieval.uri, "license.lcpl#/encryption/content_key");
        assert_eq!(
            first.compression(),
            Some(Compression {
                method: COMPRESSION_DEFLATE,
                original_length: 4096
            })
        );

        let second = &manifest.data[1];
        assert!(second.key_info.is_none());
        assert!(second.properties.is_none());
        assert_eq!(second.method.algorithm.as_deref(), Some("http://www.idpf.org/2008/embedding"));
    }

    #[test]
    fn test_data_for_file_on_empty_manifest() {
        let manifest = EncryptionManifest::default();
        assert!(manifest.data_for_file("chapter1.xhtml").is_none());
        assert!(manifest.data_for_file("").is_none());
    }

    #[test]
    fn test_data_for_file_without_matching_record() {
        let manifest = parse_str(SAMPLE).unwrap();
        assert!(manifest.data_for_file("chapter1.xhtml").is_none());
    }

    #[test]
    fn test_data_for_file_unique_match() {
        let manifest = parse_str(SAMPLE).unwrap();
        let found = manifest.data_for_file("OEBPS/chapter 1.xhtml").unwrap();
        assert_eq!(found.id.as_deref(), Some("ed1"));
        let found = manifest.data_for_file("OEBPS/fonts/serif.otf").unwrap();
        assert_eq!(found.uri(), "OEBPS/fonts/serif.otf");
    }

    #[test]
    fn test_data_for_file_does_not_normalize() {
        let manifest = parse_str(SAMPLE).unwrap();
        assert!(manifest.data_for_file("./OEBPS/fonts/serif.otf").is_none());
        assert!(manifest.data_for_file("OEBPS/fonts/serif%2Eotf").is_none());
    }

    #[test]
    fn test_write_then_read_reproduces_records() {
        let manifest = parse_str(SAMPLE).unwrap();
        let mut out = Vec::new();
        write(&mut out, &manifest).unwrap();
        let reparsed = read(out.as_slice()).unwrap();
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn test_write_is_indented_utf8() {
        let manifest = EncryptionManifest {
            data: vec![
                EncryptedData::new("a.xhtml", "urn:alg").with_compression(COMPRESSION_NONE, 12),
            ],
        };
        let xml = manifest.to_xml();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<encryption "));
        assert!(xml.contains("\n  <enc:EncryptedData>\n    <enc:EncryptionMethod Algorithm=\"urn:alg\"/>\n"));
        assert!(xml.contains("\n        <comp:Compression Method=\"0\" OriginalLength=\"12\"/>\n"));
    }

    #[test]
    fn test_empty_manifest_round_trip() {
        let xml = EncryptionManifest::default().to_xml();
        assert!(parse_str(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_latin1_document_is_decoded() {
        let mut doc = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container" xmlns:enc="http://www.w3.org/2001/04/xmlenc#">
  <enc:EncryptedData Id=""#
            .to_vec();
        doc.push(0xE9); // e-acute in Latin-1
        doc.extend_from_slice(
            br#"">
    <enc:CipherData><enc:CipherReference URI="a.xhtml"/></enc:CipherData>
  </enc:EncryptedData>
</encryption>"#,
        );

        let manifest = parse(&doc).unwrap();
        assert_eq!(manifest.data[0].id.as_deref(), Some("\u{e9}"));

        // Re-serialization is UTF-8 regardless of the source charset
        let xml = manifest.to_xml();
        assert!(xml.contains("Id=\"\u{e9}\""));
        assert!(xml.starts_with(XML_HEADER));
    }

    #[test]
    fn test_unknown_charset_is_rejected() {
        let doc = br#"<?xml version="1.0" encoding="x-klingon"?><encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"/>"#;
        assert!(matches!(parse(doc), Err(Error::FormatError(_))));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let doc = r#"<encryption xmlns="urn:example:other"/>"#;
        assert!(matches!(parse_str(doc), Err(Error::FormatError(_))));
        let doc = r#"<manifest xmlns="urn:oasis:names:tc:opendocument:xmlns:container"/>"#;
        assert!(matches!(parse_str(doc), Err(Error::FormatError(_))));
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        let doc = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"><enc:EncryptedData xmlns:enc="http://www.w3.org/2001/04/xmlenc#"></encryption>"#;
        assert!(parse_str(doc).is_err());
        assert!(parse_str("").is_err());
    }

    #[test]
    fn test_invalid_original_length_is_rejected() {
        let doc = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container" xmlns:enc="http://www.w3.org/2001/04/xmlenc#" xmlns:comp="http://www.idpf.org/2016/encryption#compression">
  <enc:EncryptedData>
    <enc:CipherData><enc:CipherReference URI="a"/></enc:CipherData>
    <enc:EncryptionProperties><enc:EncryptionProperty><comp:Compression Method="8" OriginalLength="lots"/></enc:EncryptionProperty></enc:EncryptionProperties>
  </enc:EncryptedData>
</encryption>"#;
        assert!(matches!(parse_str(doc), Err(Error::FormatError(_))));
    }

    #[test]
    fn test_escaped_attribute_round_trip() {
        let manifest = EncryptionManifest {
            data: vec![EncryptedData::new("a&b.xhtml", "urn:alg")],
        };
        let reparsed = parse_str(&manifest.to_xml()).unwrap();
        assert_eq!(reparsed.data[0].uri(), "a&b.xhtml");
    }

    #[test]
    fn test_nested_elements_do_not_override_record() {
        let doc = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"
            xmlns:enc="http://www.w3.org/2001/04/xmlenc#"
            xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
  <enc:EncryptedData>
    <enc:EncryptionMethod Algorithm="urn:data-alg"/>
    <ds:KeyInfo>
      <enc:EncryptedKey>
        <enc:EncryptionMethod Algorithm="urn:key-alg"/>
        <enc:CipherData><enc:CipherReference URI="key.bin"/></enc:CipherData>
      </enc:EncryptedKey>
      <ds:RetrievalMethod URI="license.lcpl#/encryption/content_key" Type="urn:key-type"/>
    </ds:KeyInfo>
    <enc:CipherData><enc:CipherReference URI="OEBPS/a.xhtml"/></enc:CipherData>
  </enc:EncryptedData>
</encryption>"#;
        let manifest = parse_str(doc).unwrap();
        assert_eq!(manifest.len(), 1);
        let data = &manifest.data[0];
        assert_eq!(data.method.algorithm.as_deref(), Some("urn:data-alg"));
        assert_eq!(data.uri(), "OEBPS/a.xhtml");
        let retrieval = data.key_info.as_ref().unwrap().retrieval_method.as_ref().unwrap();
        assert_eq!(retrieval.type_uri, "urn:key-type");
    }

    #[test]
    fn test_unmodelled_subtree_is_skipped() {
        let doc = r#"<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"
            xmlns:enc="http://www.w3.org/2001/04/xmlenc#">
  <enc:EncryptedData>
    <enc:Extension><enc:CipherData><enc:CipherReference URI="decoy"/></enc:CipherData></enc:Extension>
    <enc:CipherData><enc:CipherReference URI="real"/></enc:CipherData>
  </enc:EncryptedData>
</encryption>"#;
        let manifest = parse_str(doc).unwrap();
        assert_eq!(manifest.data[0].uri(), "real");
        assert!(manifest.data[0].method.algorithm.is_none());
    }
}
