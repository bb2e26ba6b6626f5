//! Parsing of `META-INF/encryption.xml`.

use super::model::*;
use super::{NS_COMPRESSION, NS_CONTAINER, NS_XMLDSIG, NS_XMLENC};
use crate::common::encoding::decode_xml_document;
use crate::common::{Error, Result};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use std::io::Read;

/// Namespaces the parser distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Container,
    XmlEnc,
    XmlDsig,
    Compression,
    Other,
}

impl Ns {
    fn from_resolved(resolved: &ResolveResult<'_>) -> Self {
        match resolved {
            ResolveResult::Bound(ns) => match ns.as_ref() {
                n if n == NS_CONTAINER.as_bytes() => Ns::Container,
                n if n == NS_XMLENC.as_bytes() => Ns::XmlEnc,
                n if n == NS_XMLDSIG.as_bytes() => Ns::XmlDsig,
                n if n == NS_COMPRESSION.as_bytes() => Ns::Compression,
                _ => Ns::Other,
            },
            _ => Ns::Other,
        }
    }
}

/// Read an encryption manifest from a stream.
///
/// The whole document is buffered, decoded with its declared charset and then
/// parsed. Only direct children of a record (and `KeyInfo/RetrievalMethod`)
/// are bound; other subtrees such as `enc:EncryptedKey` are skipped whole.
///
/// # Errors
/// [`Error::Io`] if the stream fails, [`Error::FormatError`] on malformed XML,
/// an unexpected root element, invalid integers, or an unresolvable charset.
pub fn read<R: Read>(mut reader: R) -> Result<EncryptionManifest> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse(&bytes)
}

/// Parse an encryption manifest from raw document bytes.
pub fn parse(bytes: &[u8]) -> Result<EncryptionManifest> {
    let text = decode_xml_document(bytes)?;
    parse_str(&text)
}

/// Parse an encryption manifest from already decoded text.
pub fn parse_str(xml: &str) -> Result<EncryptionManifest> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut manifest = EncryptionManifest::default();
    let mut state = ParseState::default();

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let ns = Ns::from_resolved(&resolved);

        match event {
            Event::Start(ref e) => state.open(ns, e)?,
            Event::Empty(ref e) => {
                state.open(ns, e)?;
                state.close(&mut manifest);
            },
            Event::End(_) => state.close(&mut manifest),
            Event::Text(ref t) if state.in_key_size() => {
                let text = std::str::from_utf8(t)
                    .map_err(|_| Error::FormatError("invalid UTF-8 in KeySize".to_string()))?;
                if let Some(data) = state.current.as_mut() {
                    data.method.key_size = Some(parse_int(text.trim(), "KeySize")?);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if !state.root_seen {
        return Err(Error::FormatError("encryption manifest has no root element".to_string()));
    }
    if state.current.is_some() {
        return Err(Error::FormatError("unterminated EncryptedData element".to_string()));
    }

    Ok(manifest)
}

/// Modelled elements below `enc:EncryptedData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Method,
    KeySize,
    KeyInfo,
    RetrievalMethod,
    CipherData,
    CipherReference,
    Properties,
    Property,
    Compression,
    /// Anything else; no arm matches below it, so its subtree is skipped too
    Skipped,
}

#[derive(Default)]
struct ParseState {
    root_seen: bool,
    current: Option<EncryptedData>,
    /// Open elements below the current record, innermost last
    open: Vec<Child>,
}

impl ParseState {
    fn in_key_size(&self) -> bool {
        self.open.last() == Some(&Child::KeySize)
    }

    fn open(&mut self, ns: Ns, e: &BytesStart<'_>) -> Result<()> {
        let local = e.local_name();
        let local = local.as_ref();

        if !self.root_seen {
            if ns != Ns::Container || local != b"encryption" {
                return Err(Error::FormatError(format!(
                    "expected root element <encryption> in {}, found <{}>",
                    NS_CONTAINER,
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            self.root_seen = true;
            return Ok(());
        }

        let Some(data) = self.current.as_mut() else {
            // Records other than EncryptedData are not modelled
            if (ns, local) == (Ns::XmlEnc, b"EncryptedData".as_slice()) {
                self.current = Some(encrypted_data(e)?);
                self.open.clear();
            }
            return Ok(());
        };

        let parent = self.open.last().copied();
        let child = match (parent, ns, local) {
            (None, Ns::XmlEnc, b"EncryptionMethod") => {
                data.method.algorithm = attribute(e, "Algorithm")?;
                Child::Method
            },
            (Some(Child::Method), _, b"KeySize") => Child::KeySize,
            (None, Ns::XmlDsig, b"KeyInfo") => {
                data.key_info = Some(KeyInfo {
                    key_name: attribute(e, "KeyName")?,
                    retrieval_method: None,
                });
                Child::KeyInfo
            },
            (Some(Child::KeyInfo), Ns::XmlDsig, b"RetrievalMethod") => {
                let method = RetrievalMethod {
                    uri: attribute(e, "URI")?.unwrap_or_default(),
                    type_uri: attribute(e, "Type")?.unwrap_or_default(),
                };
                data.key_info.get_or_insert_with(KeyInfo::default).retrieval_method = Some(method);
                Child::RetrievalMethod
            },
            (None, Ns::XmlEnc, b"CipherData") => Child::CipherData,
            (Some(Child::CipherData), Ns::XmlEnc, b"CipherReference") => {
                data.cipher_data.cipher_reference.uri = attribute(e, "URI")?.unwrap_or_default();
                Child::CipherReference
            },
            (None, Ns::XmlEnc, b"EncryptionProperties") => {
                data.properties.get_or_insert_with(EncryptionProperties::default);
                Child::Properties
            },
            (Some(Child::Properties), Ns::XmlEnc, b"EncryptionProperty") => {
                data.properties
                    .get_or_insert_with(EncryptionProperties::default)
                    .properties
                    .push(EncryptionProperty::default());
                Child::Property
            },
            (Some(Child::Property), Ns::Compression, b"Compression") => {
                let compression = compression(e)?;
                let property = data
                    .properties
                    .as_mut()
                    .and_then(|properties| properties.properties.last_mut());
                if let Some(property) = property {
                    property.compression = Some(compression);
                }
                Child::Compression
            },
            _ => Child::Skipped,
        };
        self.open.push(child);
        Ok(())
    }

    fn close(&mut self, manifest: &mut EncryptionManifest) {
        if self.current.is_none() {
            return;
        }
        if self.open.pop().is_none() {
            if let Some(data) = self.current.take() {
                manifest.data.push(data);
            }
        }
    }
}

fn encrypted_data(e: &BytesStart<'_>) -> Result<EncryptedData> {
    let mut data = EncryptedData::default();
    for (key, value) in attributes(e)? {
        match key.as_str() {
            "Id" => data.id = Some(value),
            "Type" => data.type_uri = Some(value),
            "MimeType" => data.mime_type = Some(value),
            "Encoding" => data.encoding = Some(value),
            _ => {},
        }
    }
    Ok(data)
}

fn compression(e: &BytesStart<'_>) -> Result<Compression> {
    let method = attribute(e, "Method")?.unwrap_or_else(|| "0".to_string());
    let length = attribute(e, "OriginalLength")?.unwrap_or_else(|| "0".to_string());
    Ok(Compression {
        method: parse_int(&method, "Compression Method")?,
        original_length: parse_int(&length, "Compression OriginalLength")?,
    })
}

/// Collect the unqualified attributes of an element, unescaped.
fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        out.push((key, attribute_value(&attr.value)?));
    }
    Ok(out)
}

/// Look up one unqualified attribute.
fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attribute_value(&attr.value)?));
        }
    }
    Ok(None)
}

fn attribute_value(raw: &[u8]) -> Result<String> {
    let raw = std::str::from_utf8(raw)
        .map_err(|_| Error::FormatError("invalid UTF-8 in attribute value".to_string()))?;
    quick_xml::escape::unescape(raw)
        .map(|value| value.into_owned())
        .map_err(|e| Error::FormatError(format!("invalid attribute value '{}': {}", raw, e)))
}

fn parse_int<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::FormatError(format!("invalid {}: '{}'", what, text)))
}
