//! CMS entry model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Field values keyed by locale
pub type LocalizedField = IndexMap<String, Value>;

/// Content type of an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    Config,
    Collection,
    Post,
    Author,
    Page,
    Other(String),
}

impl ContentType {
    pub fn from_id(id: &str) -> Self {
        match id {
            "config" => ContentType::Config,
            "collection" => ContentType::Collection,
            "post" => ContentType::Post,
            "author" => ContentType::Author,
            "page" => ContentType::Page,
            other => ContentType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentType::Config => "config",
            ContentType::Collection => "collection",
            ContentType::Post => "post",
            ContentType::Author => "author",
            ContentType::Page => "page",
            ContentType::Other(id) => id,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{"sys": {"id": "post"}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SysLink {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkSys {
    #[serde(default)]
    pub id: String,
}

/// System metadata of an entry, asset, or link
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub content_type: Option<SysLink>,
}

impl Sys {
    /// Whether this is an unresolved link (`{"sys": {"type": "Link", ...}}`)
    pub fn is_link(&self) -> bool {
        self.kind.as_deref() == Some("Link")
    }
}

/// A CMS record: entry or asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub sys: Sys,
    #[serde(default)]
    pub fields: IndexMap<String, LocalizedField>,
}

impl Entry {
    pub fn id(&self) -> Option<&str> {
        self.sys.id.as_deref()
    }

    pub fn content_type(&self) -> ContentType {
        self.sys
            .content_type
            .as_ref()
            .map(|ct| ContentType::from_id(&ct.sys.id))
            .unwrap_or_else(|| ContentType::Other(String::new()))
    }

    /// Value of a field at a locale
    pub fn field(&self, name: &str, locale: &str) -> Option<&Value> {
        self.fields.get(name).and_then(|f| f.get(locale))
    }

    /// String value of a field at a locale
    pub fn field_str(&self, name: &str, locale: &str) -> Option<&str> {
        self.field(name, locale).and_then(Value::as_str)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
