//! cms-ssg: builds a static site from a CMS content snapshot
//!
//! Entries are resolved for one locale, rendered through HTML templates with
//! `<%= %>` expressions and include fragments, and written as one HTML file
//! per post, author, page, plus an index.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod template;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use commands::build::BuildReport;

/// A site rooted at a base directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Build settings
    pub settings: config::Settings,
    /// Environment captured at startup
    pub env: config::EnvVars,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content snapshot file
    pub content_path: PathBuf,
    /// Page templates (`post.html`, `author.html`, ...)
    pub template_dir: PathBuf,
    /// Include fragments
    pub include_dir: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
}

impl Site {
    /// Create a site from a directory, reading the process environment
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        Self::with_env(base_dir, config::EnvVars::from_process())
    }

    /// Create a site from a directory with an explicit environment
    pub fn with_env<P: AsRef<Path>>(base_dir: P, env: config::EnvVars) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let settings_path = base_dir.join("_config.yml");

        let mut settings = if settings_path.exists() {
            config::Settings::load(&settings_path)?
        } else {
            config::Settings::default()
        };
        settings.apply_env(&env);

        Ok(Self::from_settings(base_dir, settings, env))
    }

    /// Create a site from settings that are already final
    pub fn from_settings(base_dir: PathBuf, settings: config::Settings, env: config::EnvVars) -> Self {
        let content_path = base_dir.join(&settings.content_file);
        let template_dir = base_dir.join(&settings.template_dir);
        let include_dir = base_dir.join(&settings.include_dir);
        let output_dir = base_dir.join(&settings.output_dir);

        Self {
            settings,
            env,
            base_dir,
            content_path,
            template_dir,
            include_dir,
            output_dir,
        }
    }

    /// Override the output directory
    pub fn set_output_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.output_dir = self.base_dir.join(dir);
    }

    /// Override the content locale
    pub fn set_locale(&mut self, locale: &str) {
        self.settings.locale = locale.to_string();
    }

    /// The JSON config file layered into the site config, if configured
    pub fn config_path(&self) -> Option<PathBuf> {
        self.settings
            .config_file
            .as_ref()
            .map(|file| self.base_dir.join(file))
    }

    /// Where the page with this identifier is written
    pub fn page_path(&self, identifier: &str) -> PathBuf {
        self.output_dir.join(format!("{}.html", identifier))
    }

    /// Build the site
    pub fn build(&self) -> Result<BuildReport> {
        commands::build::run(self)
    }

    /// Clean the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
