//! List snapshot content

use anyhow::{bail, Result};

use crate::content::{ContentSnapshot, ContentType, Entry};
use crate::Site;

const TYPES: [&str; 5] = ["post", "author", "page", "collection", "config"];

/// List snapshot entries, all types or one
pub fn run(site: &Site, content_type: Option<&str>) -> Result<()> {
    let snapshot = super::build::load_snapshot(site)?;
    for line in summarize(&snapshot, content_type, &site.settings.locale)? {
        println!("{}", line);
    }
    Ok(())
}

/// One heading line per type followed by one indented line per entry
pub fn summarize(
    snapshot: &ContentSnapshot,
    content_type: Option<&str>,
    locale: &str,
) -> Result<Vec<String>> {
    let types: Vec<&str> = match content_type {
        Some(name) => {
            let name = name.strip_suffix('s').unwrap_or(name);
            if !TYPES.contains(&name) {
                bail!(
                    "Unknown type: {}. Available: {}",
                    name,
                    TYPES.join(", ")
                );
            }
            vec![name]
        }
        None => TYPES.to_vec(),
    };

    let mut lines = Vec::new();
    for name in types {
        let content_type = ContentType::from_id(name);
        let entries: Vec<&Entry> = snapshot.of_type(&content_type).collect();
        lines.push(format!("{} ({}):", heading(name), entries.len()));
        for entry in entries {
            lines.push(format!("  {}", describe(entry, &content_type, locale)));
        }
    }
    Ok(lines)
}

fn heading(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}s", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

fn describe(entry: &Entry, content_type: &ContentType, locale: &str) -> String {
    let id = entry.id().unwrap_or("?");
    let field = |name: &str| entry.field_str(name, locale).unwrap_or("-");
    match content_type {
        ContentType::Post | ContentType::Page => {
            format!("{} - {} [{}]", field("slug"), field("title"), id)
        }
        ContentType::Author => format!("{} - {} [{}]", field("slug"), field("name"), id),
        ContentType::Collection => {
            let items = entry
                .field("items", locale)
                .and_then(|items| items.as_array())
                .map_or(0, Vec::len);
            format!("{} ({} items) [{}]", field("title"), items, id)
        }
        ContentType::Config => {
            let value = entry
                .field("value", locale)
                .map(|v| v.to_string())
                .unwrap_or_default();
            format!("{} = {}", field("key"), value)
        }
        ContentType::Other(_) => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ContentSnapshot {
        ContentSnapshot::from_json(
            r#"{"entries": [
                {"sys": {"id": "p1", "contentType": {"sys": {"id": "post"}}},
                 "fields": {"slug": {"en-US": "hello"}, "title": {"en-US": "Hello"}}},
                {"sys": {"id": "c1", "contentType": {"sys": {"id": "config"}}},
                 "fields": {"key": {"en-US": "lang"}, "value": {"en-US": "de"}}},
                {"sys": {"id": "n1", "contentType": {"sys": {"id": "nav"}}},
                 "fields": {}}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_summarize_one_type() {
        let lines = summarize(&snapshot(), Some("posts"), "en-US").unwrap();
        assert_eq!(lines, vec!["Posts (1):", "  hello - Hello [p1]"]);

        let lines = summarize(&snapshot(), Some("config"), "en-US").unwrap();
        assert_eq!(lines, vec!["Configs (1):", "  lang = \"de\""]);
    }

    #[test]
    fn test_summarize_all_types() {
        let lines = summarize(&snapshot(), None, "en-US").unwrap();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[2], "Authors (0):");
    }

    #[test]
    fn test_unknown_type() {
        assert!(summarize(&snapshot(), Some("tag"), "en-US").is_err());
    }
}
