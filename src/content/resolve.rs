//! Field resolution: project an entry into render-ready content for one locale

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ContentSnapshot, ContentType, Entry, MarkdownRenderer};

/// Fields that are not part of a content type's known set, passed through as-is
pub type ExtraFields = IndexMap<String, Value>;

/// Render-ready content, one variant per content type.
///
/// Serializes as a single flat object: known fields under their CMS names,
/// unknown fields flattened alongside, absent values omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResolvedContent {
    Post(PostContent),
    Author(AuthorContent),
    Page(PageContent),
    Index(IndexContent),
}

impl ResolvedContent {
    pub fn slug(&self) -> Option<&str> {
        match self {
            ResolvedContent::Post(post) => post.slug.as_deref(),
            ResolvedContent::Author(author) => author.slug.as_deref(),
            ResolvedContent::Page(page) => page.slug.as_deref(),
            ResolvedContent::Index(_) => Some("index"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PostContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero: Option<AssetRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorRef>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthorContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<AssetRef>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Content of the synthetic index page
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexContent {
    pub posts: Vec<Value>,
}

/// Flattened asset reference
#[derive(Debug, Clone, Serialize)]
pub struct AssetRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<AssetFile>,
}

/// File metadata of an asset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Flattened author reference on a post
#[derive(Debug, Clone, Serialize)]
pub struct AuthorRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Resolves entries against a snapshot (for links) and a markdown renderer
pub struct FieldResolver<'a> {
    snapshot: &'a ContentSnapshot,
    renderer: &'a MarkdownRenderer,
}

impl<'a> FieldResolver<'a> {
    pub fn new(snapshot: &'a ContentSnapshot, renderer: &'a MarkdownRenderer) -> Self {
        Self { snapshot, renderer }
    }

    /// Resolve an entry by its content type.
    ///
    /// Returns `None` for types that do not render as content (`config`,
    /// `collection`, unknown types).
    pub fn resolve(&self, entry: &Entry, locale: &str) -> Option<ResolvedContent> {
        match entry.content_type() {
            ContentType::Post => Some(ResolvedContent::Post(self.resolve_post(entry, locale))),
            ContentType::Author => {
                Some(ResolvedContent::Author(self.resolve_author(entry, locale)))
            }
            ContentType::Page => Some(ResolvedContent::Page(self.resolve_page(entry, locale))),
            _ => None,
        }
    }

    pub fn resolve_post(&self, entry: &Entry, locale: &str) -> PostContent {
        let mut post = PostContent::default();
        for (name, value) in localized(entry, locale) {
            match name {
                "title" => post.title = as_string(value),
                "slug" => post.slug = as_string(value),
                "content" => post.content = self.markdown(value),
                "abstract" => post.summary = self.markdown(value),
                "hero" => post.hero = value.and_then(|v| self.asset(v, locale)),
                "author" => post.author = value.and_then(|v| self.author(v, locale)),
                _ => pass_through(&mut post.extra, name, value),
            }
        }
        post
    }

    pub fn resolve_author(&self, entry: &Entry, locale: &str) -> AuthorContent {
        let mut author = AuthorContent::default();
        for (name, value) in localized(entry, locale) {
            match name {
                "name" => author.name = as_string(value),
                "slug" => author.slug = as_string(value),
                "description" => author.description = self.markdown(value),
                "photo" => author.photo = value.and_then(|v| self.asset(v, locale)),
                _ => pass_through(&mut author.extra, name, value),
            }
        }
        author
    }

    pub fn resolve_page(&self, entry: &Entry, locale: &str) -> PageContent {
        let mut page = PageContent::default();
        for (name, value) in localized(entry, locale) {
            match name {
                "title" => page.title = as_string(value),
                "slug" => page.slug = as_string(value),
                "content" => page.content = self.markdown(value),
                _ => pass_through(&mut page.extra, name, value),
            }
        }
        page
    }

    fn markdown(&self, value: Option<&Value>) -> Option<String> {
        value
            .and_then(Value::as_str)
            .map(|md| self.renderer.render(md))
    }

    fn asset(&self, value: &Value, locale: &str) -> Option<AssetRef> {
        let asset = self.snapshot.dereference(value)?;
        Some(AssetRef {
            title: asset.field_str("title", locale).map(str::to_string),
            file: asset
                .field("file", locale)
                .and_then(|f| serde_json::from_value(f.clone()).ok()),
        })
    }

    fn author(&self, value: &Value, locale: &str) -> Option<AuthorRef> {
        let author = self.snapshot.dereference(value)?;
        Some(AuthorRef {
            name: author.field_str("name", locale).map(str::to_string),
            slug: author.field_str("slug", locale).map(str::to_string),
        })
    }
}

/// Every declared field with its value at `locale` (if any)
fn localized<'e>(
    entry: &'e Entry,
    locale: &'e str,
) -> impl Iterator<Item = (&'e str, Option<&'e Value>)> {
    entry
        .fields
        .iter()
        .map(move |(name, values)| (name.as_str(), values.get(locale)))
}

fn as_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn pass_through(extra: &mut ExtraFields, name: &str, value: Option<&Value>) {
    if let Some(value) = value {
        extra.insert(name.to_string(), value.clone());
    }
}
