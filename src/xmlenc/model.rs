//! Data types of the XML encryption manifest.
//!
//! The structure follows the subset of W3C XML Encryption used by EPUB
//! (`META-INF/encryption.xml`): one [`EncryptedData`] record per protected
//! resource, each pointing at the resource through its cipher reference URI.

/// Compression method identifier for resources deflated before encryption.
pub const COMPRESSION_DEFLATE: u16 = 8;

/// Compression method identifier for resources encrypted as-is.
pub const COMPRESSION_NONE: u16 = 0;

/// Parsed `META-INF/encryption.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionManifest {
    /// Cipher-data records in document order
    pub data: Vec<EncryptedData>,
}

/// One `enc:EncryptedData` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedData {
    pub id: Option<String>,
    pub type_uri: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    pub method: EncryptionMethod,
    pub key_info: Option<KeyInfo>,
    pub cipher_data: CipherData,
    pub properties: Option<EncryptionProperties>,
}

/// `enc:EncryptionMethod`: algorithm identifier and optional key size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionMethod {
    pub algorithm: Option<String>,
    pub key_size: Option<u32>,
}

/// `ds:KeyInfo` back-reference to the key that protects the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub key_name: Option<String>,
    pub retrieval_method: Option<RetrievalMethod>,
}

/// `ds:RetrievalMethod`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalMethod {
    pub uri: String,
    pub type_uri: String,
}

/// `enc:CipherData`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipherData {
    pub cipher_reference: CipherReference,
}

/// `enc:CipherReference`: escaped URI of the protected resource inside the container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipherReference {
    pub uri: String,
}

/// `enc:EncryptionProperties`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionProperties {
    pub properties: Vec<EncryptionProperty>,
}

/// `enc:EncryptionProperty`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionProperty {
    pub compression: Option<Compression>,
}

/// `comp:Compression` descriptor: how the plaintext was compressed and its size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Compression {
    pub method: u16,
    pub original_length: u64,
}

impl EncryptedData {
    /// Record for a resource at `uri` encrypted with `algorithm`.
    pub fn new(uri: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            method: EncryptionMethod {
                algorithm: Some(algorithm.into()),
                key_size: None,
            },
            cipher_data: CipherData {
                cipher_reference: CipherReference { uri: uri.into() },
            },
            ..Default::default()
        }
    }

    /// The cipher reference URI of this record.
    #[inline]
    pub fn uri(&self) -> &str {
        &self.cipher_data.cipher_reference.uri
    }

    /// First compression descriptor among the record's properties.
    pub fn compression(&self) -> Option<Compression> {
        self.properties
            .as_ref()?
            .properties
            .iter()
            .find_map(|p| p.compression)
    }

    /// Builder-style setter for a key-info retrieval method.
    pub fn with_retrieval_method(mut self, uri: &str, type_uri: &str) -> Self {
        self.key_info = Some(KeyInfo {
            key_name: None,
            retrieval_method: Some(RetrievalMethod {
                uri: uri.to_string(),
                type_uri: type_uri.to_string(),
            }),
        });
        self
    }

    /// Builder-style setter for a compression descriptor.
    pub fn with_compression(mut self, method: u16, original_length: u64) -> Self {
        self.properties = Some(EncryptionProperties {
            properties: vec![EncryptionProperty {
                compression: Some(Compression {
                    method,
                    original_length,
                }),
            }],
        });
        self
    }
}
