//! Serialization of `META-INF/encryption.xml`.

use super::model::*;
use super::{NS_COMPRESSION, NS_CONTAINER, NS_XMLDSIG, NS_XMLENC};
use crate::common::Result;
use crate::common::xml::escape_xml;
use std::io::Write;

/// Standard declaration emitted ahead of every serialized manifest.
pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Write an encryption manifest to a stream.
///
/// Output is always UTF-8 with a standard XML declaration and two-space
/// indentation, whatever the charset of the document the manifest was read from.
pub fn write<W: Write>(mut writer: W, manifest: &EncryptionManifest) -> Result<()> {
    writer.write_all(to_xml(manifest).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Serialize an encryption manifest to a string.
pub fn to_xml(manifest: &EncryptionManifest) -> String {
    let mut out = IndentedXml::with_capacity(256 + manifest.data.len() * 512);
    out.line(XML_HEADER);

    let root_attrs = [
        ("xmlns", Some(NS_CONTAINER)),
        ("xmlns:enc", Some(NS_XMLENC)),
        ("xmlns:ds", Some(NS_XMLDSIG)),
        ("xmlns:comp", Some(NS_COMPRESSION)),
    ];

    if manifest.data.is_empty() {
        out.empty("encryption", &root_attrs);
        return out.finish();
    }

    out.open("encryption", &root_attrs);
    for data in &manifest.data {
        write_data(&mut out, data);
    }
    out.close("encryption");
    out.finish()
}

fn write_data(out: &mut IndentedXml, data: &EncryptedData) {
    out.open(
        "enc:EncryptedData",
        &[
            ("Id", data.id.as_deref()),
            ("Type", data.type_uri.as_deref()),
            ("MimeType", data.mime_type.as_deref()),
            ("Encoding", data.encoding.as_deref()),
        ],
    );

    let method_attrs = [("Algorithm", data.method.algorithm.as_deref())];
    match data.method.key_size {
        Some(key_size) => {
            out.open("enc:EncryptionMethod", &method_attrs);
            out.text_element("enc:KeySize", &key_size.to_string());
            out.close("enc:EncryptionMethod");
        },
        None if data.method.algorithm.is_some() => out.empty("enc:EncryptionMethod", &method_attrs),
        None => {},
    }

    if let Some(key_info) = &data.key_info {
        let attrs = [("KeyName", key_info.key_name.as_deref())];
        match &key_info.retrieval_method {
            Some(method) => {
                out.open("ds:KeyInfo", &attrs);
                out.empty(
                    "ds:RetrievalMethod",
                    &[
                        ("URI", Some(method.uri.as_str())),
                        ("Type", Some(method.type_uri.as_str())),
                    ],
                );
                out.close("ds:KeyInfo");
            },
            None => out.empty("ds:KeyInfo", &attrs),
        }
    }

    out.open("enc:CipherData", &[]);
    out.empty("enc:CipherReference", &[("URI", Some(data.uri()))]);
    out.close("enc:CipherData");

    if let Some(properties) = &data.properties {
        out.open("enc:EncryptionProperties", &[]);
        for property in &properties.properties {
            match &property.compression {
                Some(compression) => {
                    let method = compression.method.to_string();
                    let length = compression.original_length.to_string();
                    out.open("enc:EncryptionProperty", &[]);
                    out.empty(
                        "comp:Compression",
                        &[
                            ("Method", Some(method.as_str())),
                            ("OriginalLength", Some(length.as_str())),
                        ],
                    );
                    out.close("enc:EncryptionProperty");
                },
                None => out.empty("enc:EncryptionProperty", &[]),
            }
        }
        out.close("enc:EncryptionProperties");
    }

    out.close("enc:EncryptedData");
}

/// Minimal pretty-printer: one element per line, two spaces per level.
struct IndentedXml {
    buf: String,
    depth: usize,
}

impl IndentedXml {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buf.push_str("  ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    fn tag(name: &str, attrs: &[(&str, Option<&str>)], self_closing: bool) -> String {
        let mut tag = format!("<{}", name);
        for (key, value) in attrs {
            if let Some(value) = value {
                tag.push_str(&format!(r#" {}="{}""#, key, escape_xml(value)));
            }
        }
        tag.push_str(if self_closing { "/>" } else { ">" });
        tag
    }

    fn open(&mut self, name: &str, attrs: &[(&str, Option<&str>)]) {
        self.line(&Self::tag(name, attrs, false));
        self.depth += 1;
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, Option<&str>)]) {
        self.line(&Self::tag(name, attrs, true));
    }

    fn text_element(&mut self, name: &str, text: &str) {
        self.line(&format!("<{}>{}</{}>", name, escape_xml(text), name));
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{}>", name));
    }

    fn finish(self) -> String {
        self.buf
    }
}
