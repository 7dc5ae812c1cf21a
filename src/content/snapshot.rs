//! Content snapshot loader

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{ContentType, Entry};

/// Errors loading a content snapshot
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read content snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid content snapshot {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A previously synced content snapshot: `{entries: [...], assets: [...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentSnapshot {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub assets: Vec<Entry>,
    #[serde(skip)]
    entry_index: HashMap<String, usize>,
    #[serde(skip)]
    asset_index: HashMap<String, usize>,
}

impl ContentSnapshot {
    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ContentError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut snapshot: ContentSnapshot = serde_json::from_str(json)?;
        snapshot.build_index();
        Ok(snapshot)
    }

    fn build_index(&mut self) {
        self.entry_index = index_by_id(&self.entries);
        self.asset_index = index_by_id(&self.assets);
    }

    /// Entries of one content type, in source order
    pub fn of_type<'a>(&'a self, content_type: &'a ContentType) -> impl Iterator<Item = &'a Entry> {
        self.entries
            .iter()
            .filter(move |e| &e.content_type() == content_type)
    }

    pub fn entry(&self, id: &str) -> Option<&Entry> {
        self.entry_index.get(id).map(|&i| &self.entries[i])
    }

    pub fn asset(&self, id: &str) -> Option<&Entry> {
        self.asset_index.get(id).map(|&i| &self.assets[i])
    }

    /// Turn a reference value into the entry or asset it refers to.
    ///
    /// Inline records (`{sys, fields}`) are used as they are; sync-API links
    /// are looked up by id. Anything else is `None`.
    pub fn dereference(&self, value: &Value) -> Option<Entry> {
        let entry: Entry = serde_json::from_value(value.clone()).ok()?;
        if !entry.sys.is_link() {
            return Some(entry);
        }
        let id = entry.sys.id.as_deref()?;
        let target = match entry.sys.link_type.as_deref() {
            Some("Asset") => self.asset(id),
            _ => self.entry(id),
        };
        if target.is_none() {
            tracing::debug!("Unresolved link {}", id);
        }
        target.cloned()
    }
}

fn index_by_id(records: &[Entry]) -> HashMap<String, usize> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.id().map(|id| (id.to_string(), i)))
        .collect()
}
