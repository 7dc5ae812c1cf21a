//! Site config: the key/value map exposed to templates as `config`

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::{EnvVars, Settings};

/// Flat key/value configuration, built once per run and read-only afterward
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SiteConfig {
    values: IndexMap<String, Value>,
}

impl SiteConfig {
    /// Empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the values the settings provide (`webHost`, `baseHref`)
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Self::new();
        config.set("webHost", Value::String(settings.web_host.clone()));
        config.set("baseHref", Value::String(settings.base_href.clone()));
        config
    }

    /// Layer a JSON config file on top. The file must exist.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let values: IndexMap<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("Config file {:?} is not a JSON object", path))?;
        tracing::debug!("Loaded {} config values from {:?}", values.len(), path);
        self.values.extend(values);
        Ok(())
    }

    /// Layer CMS-provided entries on top
    pub fn merge_entries<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in entries {
            self.set(&key, value);
        }
    }

    /// Replace every value that has a `CONFIG_<KEY>` environment override
    pub fn apply_env(&mut self, env: &EnvVars) {
        for (key, value) in self.values.iter_mut() {
            if let Some(override_value) = env.config_override(key) {
                tracing::debug!("Config {} overridden from environment", key);
                *value = Value::String(override_value.to_string());
            }
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value rendered as a string; absent values are empty
    pub fn get_str(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cms_entries() -> Vec<(String, Value)> {
        vec![("webHost".to_string(), json!("https://example.com"))]
    }

    #[test]
    fn test_cms_entry_overrides_settings() {
        let mut config = SiteConfig::from_settings(&Settings::default());
        config.merge_entries(cms_entries());
        config.apply_env(&EnvVars::default());
        assert_eq!(config.get_str("webHost"), "https://example.com");
        assert_eq!(config.get_str("baseHref"), "/");
    }

    #[test]
    fn test_env_override_wins() {
        let mut config = SiteConfig::new();
        config.merge_entries(cms_entries());
        config.apply_env(&EnvVars::from_pairs([(
            "CONFIG_WEBHOST",
            "https://staging.example.com",
        )]));
        assert_eq!(config.get_str("webHost"), "https://staging.example.com");
    }

    #[test]
    fn test_merge_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"twitter": "@remote", "perPage": 10}"#).unwrap();

        let mut config = SiteConfig::new();
        config.merge_file(&path).unwrap();
        assert_eq!(config.get_str("twitter"), "@remote");
        assert_eq!(config.get_str("perPage"), "10");
        assert_eq!(config.get_str("missing"), "");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::new();
        assert!(config.merge_file(dir.path().join("nope.json")).is_err());
    }
}
