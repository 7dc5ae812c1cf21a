//! Build settings (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::EnvVars;

/// Build settings for one site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Build metadata
    pub name: String,
    pub version: String,
    pub environment: String,

    // Web config
    pub app_name: String,
    pub description: String,
    pub lang: String,
    pub base_href: String,
    pub web_host: String,

    // Content
    pub locale: String,
    pub content_file: String,
    pub config_file: Option<String>,

    // Directories
    pub template_dir: String,
    pub include_dir: String,
    pub output_dir: String,

    // Rendering
    pub highlight: bool,
    pub strict_includes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "site".to_string(),
            version: "0.0.0".to_string(),
            environment: "production".to_string(),

            app_name: String::new(),
            description: String::new(),
            lang: "en".to_string(),
            base_href: "/".to_string(),
            web_host: "http://localhost".to_string(),

            locale: "en-US".to_string(),
            content_file: "build/content.json".to_string(),
            config_file: None,

            template_dir: "src".to_string(),
            include_dir: "src/includes".to_string(),
            output_dir: "build".to_string(),

            highlight: false,
            strict_includes: false,
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {:?}", path))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid settings {:?}", path))?;
        Ok(settings)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvVars) {
        if let Some(environment) = env.get("ENVIRONMENT") {
            self.environment = environment.to_string();
        }
        if let Some(locale) = env.get("CONTENTFUL_LOCALE") {
            self.locale = locale.to_string();
        }
        if let Some(base_href) = env.get("BASE_HREF") {
            self.base_href = base_href.to_string();
        }
        if let Some(web_host) = env.get("WEB_HOST") {
            self.web_host = web_host.to_string();
        }
    }
}

/// Configuration handed to the front-end, persisted as `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebConfig {
    pub environment: String,
    pub version: String,
    pub name: String,
    pub app_name: String,
    pub description: String,
    pub lang: String,
    pub base_href: String,
    pub web_host: String,
}

impl From<&Settings> for WebConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            environment: settings.environment.clone(),
            version: settings.version.clone(),
            name: settings.name.clone(),
            app_name: settings.app_name.clone(),
            description: settings.description.clone(),
            lang: settings.lang.clone(),
            base_href: settings.base_href.clone(),
            web_host: settings.web_host.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.environment, "production");
        assert_eq!(settings.output_dir, "build");
        assert!(settings.config_file.is_none());
    }

    #[test]
    fn test_parse_settings() {
        let yaml = r#"
name: lets-work-remote
version: 1.2.0
locale: de
template_dir: templates
strict_includes: true
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.name, "lets-work-remote");
        assert_eq!(settings.locale, "de");
        assert_eq!(settings.template_dir, "templates");
        assert!(settings.strict_includes);
        assert_eq!(settings.output_dir, "build");
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        let env = EnvVars::from_pairs([
            ("ENVIRONMENT", "development"),
            ("CONTENTFUL_LOCALE", "de"),
            ("WEB_HOST", "https://example.com"),
        ]);
        settings.apply_env(&env);
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.locale, "de");
        assert_eq!(settings.web_host, "https://example.com");
        assert_eq!(settings.base_href, "/");
    }

    #[test]
    fn test_web_config_uses_camel_case() {
        let settings = Settings {
            app_name: "Let's Work Remote".to_string(),
            ..Settings::default()
        };
        let json = serde_json::to_value(WebConfig::from(&settings)).unwrap();
        assert_eq!(json["appName"], "Let's Work Remote");
        assert_eq!(json["baseHref"], "/");
        assert!(json.get("webHost").is_some());
    }
}
