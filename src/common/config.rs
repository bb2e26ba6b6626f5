//! Configuration for packaging passes.
//!
//! Every field has a default, so an empty TOML document (or
//! [`PackConfig::default`]) reproduces the historical behavior of the packager.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content protection scheme recorded in JSON manifest encryption records.
pub const LCP_SCHEME: &str = "http://readium.org/2014/01/lcp";

/// Where an EPUB reading system finds the content key of an LCP-protected resource.
pub const LCP_CONTENT_KEY_URI: &str = "license.lcpl#/encryption/content_key";

/// Retrieval method type of the LCP content key.
pub const LCP_CONTENT_KEY_TYPE: &str = "http://readium.org/2014/01/lcp#EncryptedContentKey";

/// What a writer does when asked to mark a path that was never written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedMark {
    /// Log a warning and leave the manifest unchanged
    #[default]
    Ignore,
    /// Fail with [`Error::InvalidState`]
    Reject,
}

/// Settings shared by every package writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Handling of `mark_as_encrypted` calls that match no written entry
    #[serde(default)]
    pub unmatched_mark: UnmatchedMark,

    /// Scheme identifier written into JSON encryption records
    #[serde(default = "default_scheme")]
    pub encryption_scheme: String,

    /// KeyInfo retrieval URI written into XML encryption records
    #[serde(default = "default_content_key_uri")]
    pub content_key_uri: String,

    /// KeyInfo retrieval type written into XML encryption records
    #[serde(default = "default_content_key_type")]
    pub content_key_type: String,
}

fn default_scheme() -> String {
    LCP_SCHEME.to_string()
}

fn default_content_key_uri() -> String {
    LCP_CONTENT_KEY_URI.to_string()
}

fn default_content_key_type() -> String {
    LCP_CONTENT_KEY_TYPE.to_string()
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            unmatched_mark: UnmatchedMark::default(),
            encryption_scheme: default_scheme(),
            content_key_uri: default_content_key_uri(),
            content_key_type: default_content_key_type(),
        }
    }
}

impl PackConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Serialize the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builder-style setter for the unmatched-mark policy.
    pub fn with_unmatched_mark(mut self, policy: UnmatchedMark) -> Self {
        self.unmatched_mark = policy;
        self
    }
}
