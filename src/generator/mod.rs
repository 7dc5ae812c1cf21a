//! Generator module - renders one page per call and writes it to the output directory

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::SiteConfig;
use crate::content::{Collections, ResolvedContent};
use crate::helpers::Helpers;
use crate::template::{expand, IncludeSet, Scope, TemplateError};
use crate::Site;

/// Page types and the template file each renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTemplate {
    Index,
    Post,
    Author,
    Page,
}

impl PageTemplate {
    /// Get the template name for this page type
    pub fn template_name(&self) -> &'static str {
        match self {
            PageTemplate::Index => "index",
            PageTemplate::Post => "post",
            PageTemplate::Author => "author",
            PageTemplate::Page => "page",
        }
    }
}

/// Build metadata shared by every page of a run
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub environment: String,
    pub version: String,
    pub name: String,
    /// Milliseconds since the epoch at the start of the run
    pub time: i64,
    pub locale: String,
}

/// `build` as seen by one page
#[derive(Debug, Clone, Serialize)]
pub struct PageBuild<'a> {
    pub identifier: String,
    #[serde(flatten)]
    pub info: &'a BuildInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub url: String,
}

/// Everything a page template renders against
#[derive(Debug, Clone, Serialize)]
pub struct PageContext<'a> {
    pub build: PageBuild<'a>,
    pub config: &'a SiteConfig,
    pub content: ResolvedContent,
    pub collections: &'a Collections,
    pub includes: IndexMap<String, String>,
    pub page: PageMeta,
}

impl PageContext<'_> {
    /// Serialize for template evaluation
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Renders pages for one build run
pub struct Generator<'a> {
    site: &'a Site,
    config: &'a SiteConfig,
    collections: &'a Collections,
    includes: IncludeSet,
    helpers: Helpers,
    build: BuildInfo,
}

impl<'a> Generator<'a> {
    /// Create a generator, loading the site's include fragments
    pub fn new(site: &'a Site, config: &'a SiteConfig, collections: &'a Collections) -> Result<Self> {
        let includes = IncludeSet::load(&site.include_dir)?;
        for cycle in includes.order().cycles() {
            tracing::warn!("Includes reference each other: {}", cycle.join(", "));
        }

        let settings = &site.settings;
        let build = BuildInfo {
            environment: settings.environment.clone(),
            version: settings.version.clone(),
            name: settings.name.clone(),
            time: chrono::Utc::now().timestamp_millis(),
            locale: settings.locale.clone(),
        };

        Ok(Self {
            site,
            config,
            collections,
            includes,
            helpers: Helpers::new(),
            build,
        })
    }

    /// Render one page and write it to `<output>/<identifier>.html`
    pub fn render_page(
        &self,
        content: ResolvedContent,
        identifier: &str,
        template: PageTemplate,
    ) -> Result<PageContext<'_>> {
        let output_path = self.output_path(identifier)?;
        let strict = self.site.settings.strict_includes;

        let mut context = PageContext {
            build: PageBuild {
                identifier: identifier.to_string(),
                info: &self.build,
            },
            config: self.config,
            content,
            collections: self.collections,
            includes: IndexMap::new(),
            page: PageMeta {
                url: self.page_url(identifier),
            },
        };

        let mut data = context.to_value()?;
        context.includes = self
            .includes
            .render_into(&mut data, &self.helpers, strict)
            .with_context(|| format!("Failed to render includes for {}", identifier))?;

        let template_path = self
            .site
            .template_dir
            .join(format!("{}.html", template.template_name()));
        let source = fs::read_to_string(&template_path)
            .with_context(|| format!("Failed to read template {:?}", template_path))?;

        let expansion = expand(&source, Scope::new(&data, &self.helpers))
            .with_context(|| format!("Failed to render {:?}", template_path))?;
        if !expansion.converged {
            if strict {
                return Err(TemplateError::NotConverged {
                    passes: expansion.passes,
                })
                .with_context(|| format!("Failed to render {}", identifier));
            }
            tracing::warn!("Page {} did not stabilize", identifier);
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        fs::write(&output_path, expansion.output)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::info!("Generated: {}", output_path.display());

        Ok(context)
    }

    /// `webHost + baseHref + identifier + ".html"`
    fn page_url(&self, identifier: &str) -> String {
        format!(
            "{}{}{}.html",
            self.config.get_str("webHost"),
            self.config.get_str("baseHref"),
            identifier
        )
    }

    fn output_path(&self, identifier: &str) -> Result<PathBuf> {
        let relative = Path::new(identifier);
        let is_safe = !identifier.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            bail!("Invalid page identifier {:?}", identifier);
        }
        Ok(self.site.output_dir.join(format!("{}.html", identifier)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvVars, Settings};
    use crate::content::PageContent;
    use serde_json::json;
    use tempfile::TempDir;

    fn site(dir: &TempDir) -> Site {
        let root = dir.path();
        fs::create_dir_all(root.join("src/includes")).unwrap();
        fs::write(
            root.join("src/page.html"),
            "<title><%- content.title %></title><%= includes.header %><%= content.content %>",
        )
        .unwrap();
        fs::write(
            root.join("src/includes/header.html"),
            r#"<a href="<%= page.url %>"><%= build.identifier %></a>"#,
        )
        .unwrap();
        Site::from_settings(root.to_path_buf(), Settings::default(), EnvVars::default())
    }

    fn page(slug: &str) -> ResolvedContent {
        ResolvedContent::Page(PageContent {
            title: Some("Tom & Jerry".to_string()),
            slug: Some(slug.to_string()),
            content: Some("<p>Body</p>".to_string()),
            ..PageContent::default()
        })
    }

    fn config() -> SiteConfig {
        let mut config = SiteConfig::new();
        config.set("webHost", json!("https://example.com"));
        config.set("baseHref", json!("/blog/"));
        config
    }

    #[test]
    fn test_render_page_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir);
        let config = config();
        let collections = Collections::default();
        let generator = Generator::new(&site, &config, &collections).unwrap();

        let context = generator
            .render_page(page("impressum"), "impressum", PageTemplate::Page)
            .unwrap();

        assert_eq!(context.page.url, "https://example.com/blog/impressum.html");
        assert_eq!(
            context.includes["header"],
            r#"<a href="https://example.com/blog/impressum.html">impressum</a>"#
        );

        let html = fs::read_to_string(dir.path().join("build/impressum.html")).unwrap();
        assert_eq!(
            html,
            r#"<title>Tom &amp; Jerry</title><a href="https://example.com/blog/impressum.html">impressum</a><p>Body</p>"#
        );
    }

    #[test]
    fn test_context_serializes_build_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir);
        let config = config();
        let collections = Collections::default();
        let generator = Generator::new(&site, &config, &collections).unwrap();

        let context = generator
            .render_page(page("about"), "about", PageTemplate::Page)
            .unwrap();
        let value = context.to_value().unwrap();
        assert_eq!(value["build"]["identifier"], "about");
        assert_eq!(value["build"]["environment"], "production");
        assert_eq!(value["build"]["locale"], "en-US");
        assert!(value["build"]["time"].is_i64());
        assert_eq!(value["config"]["webHost"], "https://example.com");
        assert_eq!(value["content"]["slug"], "about");
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir);
        let config = config();
        let collections = Collections::default();
        let generator = Generator::new(&site, &config, &collections).unwrap();

        let err = generator
            .render_page(page("x"), "x", PageTemplate::Author)
            .unwrap_err();
        assert!(err.to_string().contains("author.html"));
        assert!(!dir.path().join("build/x.html").exists());
    }

    #[test]
    fn test_rejects_identifiers_outside_output() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir);
        let config = config();
        let collections = Collections::default();
        let generator = Generator::new(&site, &config, &collections).unwrap();

        for identifier in ["", "../escape", "/etc/passwd"] {
            assert!(generator
                .render_page(page("x"), identifier, PageTemplate::Page)
                .is_err());
        }
        generator
            .render_page(page("x"), "blog/nested", PageTemplate::Page)
            .unwrap();
        assert!(dir.path().join("build/blog/nested.html").exists());
    }
}
