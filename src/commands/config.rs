//! Read and write the persisted web config (`config.json`)

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::config::WebConfig;
use crate::Site;

/// Look up one key of a persisted web config.
///
/// Strings come back raw, other values as compact JSON.
pub fn get<P: AsRef<Path>>(path: P, key: &str) -> Result<String> {
    let path = path.as_ref();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let config: Value =
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))?;

    match config.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(value) => Ok(value.to_string()),
        None => Err(anyhow!("Key {:?} not found in {:?}", key, path)),
    }
}

/// Serialize the web config of a site
pub fn render(site: &Site) -> Result<String> {
    let config = WebConfig::from(&site.settings);
    Ok(serde_json::to_string_pretty(&config)?)
}

/// Write the web config to a file, or stdout when no path is given
pub fn dump(site: &Site, output: Option<&Path>) -> Result<()> {
    let json = render(site)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
            fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Generated: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvVars;

    #[test]
    fn test_dump_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvVars::from_pairs([("WEB_HOST", "https://example.com")]);
        let site = Site::with_env(dir.path(), env).unwrap();
        let path = dir.path().join("build/config.json");

        dump(&site, Some(&path)).unwrap();
        assert_eq!(get(&path, "webHost").unwrap(), "https://example.com");
        assert_eq!(get(&path, "environment").unwrap(), "production");
        assert_eq!(get(&path, "baseHref").unwrap(), "/");
    }

    #[test]
    fn test_get_non_string_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"port": 8080, "flags": {"beta": true}}"#).unwrap();

        assert_eq!(get(&path, "port").unwrap(), "8080");
        assert_eq!(get(&path, "flags").unwrap(), r#"{"beta":true}"#);
    }

    #[test]
    fn test_get_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(get(&path, "name").is_err());

        fs::write(&path, "not json").unwrap();
        assert!(get(&path, "name").is_err());

        fs::write(&path, r#"{"name": "site"}"#).unwrap();
        let err = get(&path, "missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
