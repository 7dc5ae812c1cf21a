//! Clean the output directory

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::Site;

/// Remove generated pages from the output directory.
///
/// Only `*.html` files are deleted, so a content snapshot or persisted
/// `config.json` kept in the same directory survives. Directories left
/// empty are removed as well.
pub fn run(site: &Site) -> Result<()> {
    if !site.output_dir.exists() {
        return Ok(());
    }

    let pattern = format!(
        "{}/**/*.html",
        glob::Pattern::escape(&site.output_dir.to_string_lossy())
    );
    for path in glob::glob(&pattern).with_context(|| format!("Invalid pattern {}", pattern))? {
        let path = path?;
        if path == site.content_path || !path.is_file() {
            continue;
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {:?}", path))?;
        tracing::info!("Deleted: {:?}", path);
    }

    if remove_empty_dirs(&site.output_dir)? {
        tracing::info!("Deleted: {:?}", site.output_dir);
    }

    Ok(())
}

/// Remove `dir` and its subdirectories if they hold no files. Returns
/// whether `dir` itself was removed.
fn remove_empty_dirs(dir: &Path) -> Result<bool> {
    let mut empty = true;
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            empty &= remove_empty_dirs(&entry.path())?;
        } else {
            empty = false;
        }
    }

    if empty {
        fs::remove_dir(dir).with_context(|| format!("Failed to delete {:?}", dir))?;
    }
    Ok(empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvVars, Settings};

    fn site(root: &Path) -> Site {
        Site::from_settings(root.to_path_buf(), Settings::default(), EnvVars::default())
    }

    #[test]
    fn test_clean_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        fs::create_dir_all(site.output_dir.join("nested")).unwrap();
        fs::write(site.output_dir.join("index.html"), "x").unwrap();
        fs::write(site.output_dir.join("nested/page.html"), "x").unwrap();

        run(&site).unwrap();
        assert!(!site.output_dir.exists());

        // Nothing to clean is fine
        run(&site).unwrap();
    }

    #[test]
    fn test_clean_keeps_snapshot_and_web_config() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        assert!(site.content_path.starts_with(&site.output_dir));

        fs::create_dir_all(site.output_dir.join("blog")).unwrap();
        fs::write(&site.content_path, r#"{"entries": []}"#).unwrap();
        fs::write(site.output_dir.join("config.json"), "{}").unwrap();
        fs::write(site.output_dir.join("index.html"), "x").unwrap();
        fs::write(site.output_dir.join("blog/post.html"), "x").unwrap();

        run(&site).unwrap();
        assert!(site.content_path.exists());
        assert!(site.output_dir.join("config.json").exists());
        assert!(!site.output_dir.join("index.html").exists());
        assert!(!site.output_dir.join("blog").exists());

        // The next build can still read the snapshot
        assert!(crate::commands::build::load_snapshot(&site).is_ok());
    }
}
