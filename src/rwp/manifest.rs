//! Serde model of the JSON reading-order manifest.
//!
//! Only the members the packager acts on are typed. Everything else
//! (`links`, extra metadata, extension properties) lands in the `extra` maps
//! and is written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A publication manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Primary content, in reading sequence
    #[serde(rename = "readingOrder", default)]
    pub reading_order: Vec<Link>,

    /// Ancillary resources (stylesheets, images, fonts)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Link>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Publication {
    /// First reading-order link with exactly this href.
    pub fn reading_order_link_mut(&mut self, href: &str) -> Option<&mut Link> {
        self.reading_order.iter_mut().find(|link| link.href == href)
    }
}

/// Publication metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A title, either plain or keyed by language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Title {
    /// Plain title, or the lexically first localized variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Title::Plain(title) => Some(title),
            Title::Localized(map) => map.values().next().map(String::as_str),
        }
    }
}

/// A link to a resource inside the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,

    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    pub fn new(href: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            type_: type_.into(),
            ..Default::default()
        }
    }

    /// Encryption record, if any
    pub fn encrypted(&self) -> Option<&Encrypted> {
        self.properties.as_ref()?.encrypted.as_ref()
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.encrypted().is_some()
    }

    /// Copy of this link for a rewritten entry of type `type_`.
    ///
    /// Extra members and properties survive; the encryption record does not,
    /// since the new entry is unencrypted until marked.
    pub fn carried_over(&self, type_: impl Into<String>) -> Link {
        let properties = self
            .properties
            .as_ref()
            .filter(|properties| !properties.extra.is_empty())
            .map(|properties| Properties {
                encrypted: None,
                extra: properties.extra.clone(),
            });
        Link {
            href: self.href.clone(),
            type_: type_.into(),
            properties,
            extra: self.extra.clone(),
        }
    }

    /// Attach an encryption record, keeping other properties.
    pub fn set_encrypted(&mut self, encrypted: Encrypted) {
        self.properties.get_or_insert_with(Properties::default).encrypted = Some(encrypted);
    }
}

/// Link properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<Encrypted>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Encryption record of one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encrypted {
    pub scheme: String,
    pub profile: String,
    pub algorithm: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Encrypted {
    pub fn new(
        scheme: impl Into<String>,
        profile: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            profile: profile.into(),
            algorithm: algorithm.into(),
            extra: Map::new(),
        }
    }
}
