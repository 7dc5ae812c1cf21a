//! Build the site from a content snapshot

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::SiteConfig;
use crate::content::{
    Collections, ContentSnapshot, ContentType, FieldResolver, IndexContent, MarkdownRenderer,
    ResolvedContent,
};
use crate::generator::{Generator, PageTemplate};
use crate::Site;

/// What a build run produced
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Every file written, in write order
    pub written: Vec<PathBuf>,
    pub posts: usize,
    pub authors: usize,
    pub pages: usize,
    /// Serialized context of the index page
    pub index: Value,
}

/// Build every page of the site
pub fn run(site: &Site) -> Result<BuildReport> {
    let settings = &site.settings;
    let locale = settings.locale.as_str();

    let snapshot = load_snapshot(site)?;
    tracing::info!(
        "Loaded {} entries and {} assets from {:?}",
        snapshot.entries.len(),
        snapshot.assets.len(),
        site.content_path
    );

    let config = load_config(site, &snapshot)?;

    let renderer = if settings.highlight {
        MarkdownRenderer::with_highlighting("base16-ocean.dark")
    } else {
        MarkdownRenderer::new()
    };
    let resolver = FieldResolver::new(&snapshot, &renderer);
    let collections = Collections::build(&snapshot, &resolver, locale);

    let generator = Generator::new(site, &config, &collections)?;
    let mut report = BuildReport::default();

    let mut posts = Vec::new();
    for entry in snapshot.of_type(&ContentType::Post) {
        let content = ResolvedContent::Post(resolver.resolve_post(entry, locale));
        let Some(slug) = page_slug(&content, entry.id()) else {
            continue;
        };
        let context = generator.render_page(content, &slug, PageTemplate::Post)?;
        posts.push(context.to_value()?);
        report.written.push(site.page_path(&slug));
        report.posts += 1;
    }

    for entry in snapshot.of_type(&ContentType::Author) {
        let content = ResolvedContent::Author(resolver.resolve_author(entry, locale));
        let Some(slug) = page_slug(&content, entry.id()) else {
            continue;
        };
        generator.render_page(content, &slug, PageTemplate::Author)?;
        report.written.push(site.page_path(&slug));
        report.authors += 1;
    }

    for entry in snapshot.of_type(&ContentType::Page) {
        let content = ResolvedContent::Page(resolver.resolve_page(entry, locale));
        let Some(slug) = page_slug(&content, entry.id()) else {
            continue;
        };
        generator.render_page(content, &slug, PageTemplate::Page)?;
        report.written.push(site.page_path(&slug));
        report.pages += 1;
    }

    let index = ResolvedContent::Index(IndexContent { posts });
    let context = generator.render_page(index, "index", PageTemplate::Index)?;
    report.index = context.to_value()?;
    report.written.push(site.page_path("index"));

    tracing::info!(
        "Built {} posts, {} authors, {} pages and the index",
        report.posts,
        report.authors,
        report.pages
    );
    Ok(report)
}

/// Settings, then the config file, then CMS `config` entries, then `CONFIG_*`
fn load_config(site: &Site, snapshot: &ContentSnapshot) -> Result<SiteConfig> {
    let locale = site.settings.locale.as_str();
    let mut config = SiteConfig::from_settings(&site.settings);

    if let Some(path) = site.config_path() {
        config.merge_file(path)?;
    }

    config.merge_entries(snapshot.of_type(&ContentType::Config).filter_map(|entry| {
        let key = entry.field_str("key", locale)?;
        let value = entry.field("value", locale).cloned().unwrap_or(Value::Null);
        Some((key.to_string(), value))
    }));
    config.apply_env(&site.env);

    tracing::debug!("Config has {} keys", config.len());
    Ok(config)
}

fn page_slug(content: &ResolvedContent, id: Option<&str>) -> Option<String> {
    match content.slug() {
        Some(slug) if !slug.is_empty() => Some(slug.to_string()),
        _ => {
            tracing::warn!("Skipping entry {} without a slug", id.unwrap_or("<unknown>"));
            None
        }
    }
}

/// Load the snapshot only, for commands that inspect content
pub fn load_snapshot(site: &Site) -> Result<ContentSnapshot> {
    ContentSnapshot::load(&site.content_path)
        .with_context(|| format!("Cannot read content from {:?}", site.content_path))
}
