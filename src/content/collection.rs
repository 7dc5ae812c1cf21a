//! Curated collections of pages and posts

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::{ContentSnapshot, ContentType, FieldResolver, ResolvedContent};

/// Collection title -> ordered resolved items
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Collections {
    collections: IndexMap<String, Vec<ResolvedContent>>,
}

impl Collections {
    /// Build from every `collection` entry in the snapshot
    pub fn build(snapshot: &ContentSnapshot, resolver: &FieldResolver<'_>, locale: &str) -> Self {
        let mut collections = IndexMap::new();

        for entry in snapshot.of_type(&ContentType::Collection) {
            let Some(title) = entry.field_str("title", locale) else {
                tracing::warn!("Skipping collection {:?} without a title", entry.id());
                continue;
            };
            let items = entry
                .field("items", locale)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| snapshot.dereference(item))
                        .filter_map(|item| match item.content_type() {
                            ContentType::Page | ContentType::Post => {
                                resolver.resolve(&item, locale)
                            }
                            other => {
                                tracing::debug!("Collection {} skips a {} item", title, other);
                                None
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            collections.insert(title.to_string(), items);
        }

        Self { collections }
    }

    pub fn get(&self, title: &str) -> Option<&[ResolvedContent]> {
        self.collections.get(title).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
