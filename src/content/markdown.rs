//! Markdown rendering with heading ids, autolinks and optional highlighting

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::helpers::html_escape;

lazy_static! {
    static ref BARE_URL: Regex = Regex::new(r#"https?://[^\s<>"]+"#).unwrap();
}

/// Markdown renderer
pub struct MarkdownRenderer {
    highlighter: Option<Highlighter>,
}

struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer without code highlighting
    pub fn new() -> Self {
        Self { highlighter: None }
    }

    /// Create a renderer that highlights fenced code blocks
    pub fn with_highlighting(theme: &str) -> Self {
        Self {
            highlighter: Some(Highlighter {
                syntax_set: SyntaxSet::load_defaults_newlines(),
                theme_set: ThemeSet::load_defaults(),
                theme_name: theme.to_string(),
            }),
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(markdown, options);

        let events = add_heading_ids(parser);
        let events = autolink(events);
        let events = match &self.highlighter {
            Some(highlighter) => highlighter.highlight_blocks(events),
            None => events,
        };

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Give every heading without an explicit id one derived from its text
fn add_heading_ids<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut output = Vec::new();
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut heading: Option<(Tag<'a>, Vec<Event<'a>>)> = None;

    for event in events {
        match event {
            Event::Start(tag @ Tag::Heading { .. }) => {
                heading = Some((tag, Vec::new()));
            }
            Event::End(TagEnd::Heading(level)) => {
                let Some((tag, inner)) = heading.take() else {
                    output.push(Event::End(TagEnd::Heading(level)));
                    continue;
                };
                let tag = match tag {
                    Tag::Heading {
                        level,
                        id: None,
                        classes,
                        attrs,
                    } => {
                        let text: String = inner
                            .iter()
                            .filter_map(|e| match e {
                                Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                                _ => None,
                            })
                            .collect();
                        let id = unique_id(heading_id(&text), &mut used);
                        Tag::Heading {
                            level,
                            id: Some(CowStr::from(id)),
                            classes,
                            attrs,
                        }
                    }
                    other => other,
                };
                output.push(Event::Start(tag));
                output.extend(inner);
                output.push(Event::End(TagEnd::Heading(level)));
            }
            event => match heading.as_mut() {
                Some((_, inner)) => inner.push(event),
                None => output.push(event),
            },
        }
    }

    output
}

/// Heading id: word characters only, lowercased
fn heading_id(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn unique_id(id: String, used: &mut HashMap<String, usize>) -> String {
    let count = used.entry(id.clone()).or_insert(0);
    let result = if *count == 0 {
        id
    } else {
        format!("{}-{}", id, count)
    };
    *count += 1;
    result
}

/// Turn bare URLs in text into links, outside of links and code
fn autolink(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut output = Vec::with_capacity(events.len());
    let mut link_depth = 0usize;
    let mut in_code = false;

    for event in events {
        match &event {
            Event::Start(Tag::Link { .. }) => link_depth += 1,
            Event::End(TagEnd::Link) => link_depth = link_depth.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => in_code = true,
            Event::End(TagEnd::CodeBlock) => in_code = false,
            Event::Text(text) if link_depth == 0 && !in_code && BARE_URL.is_match(text) => {
                output.push(Event::Html(CowStr::from(link_urls(text))));
                continue;
            }
            _ => {}
        }
        output.push(event);
    }

    output
}

fn link_urls(text: &str) -> String {
    let mut result = String::new();
    let mut last = 0;
    for m in BARE_URL.find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')'));
        let end = m.start() + url.len();
        result.push_str(&html_escape(&text[last..m.start()]));
        let url = html_escape(url);
        result.push_str(&format!(r#"<a href="{}">{}</a>"#, url, url));
        last = end;
    }
    result.push_str(&html_escape(&text[last..]));
    result
}

impl Highlighter {
    fn highlight_blocks<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut output = Vec::with_capacity(events.len());
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = code_block.take() {
                        let highlighted = self.highlight_code(&code, lang.as_deref());
                        output.push(Event::Html(CowStr::from(highlighted)));
                    }
                }
                Event::Text(text) if code_block.is_some() => {
                    if let Some((_, code)) = code_block.as_mut() {
                        code.push_str(&text);
                    }
                }
                event => output.push(event),
            }
        }

        output
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");
        let class = html_escape(lang);

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        match theme.map(|t| highlighted_html_for_string(code, &self.syntax_set, syntax, t)) {
            Some(Ok(highlighted)) => {
                format!(r#"<figure class="highlight {}">{}</figure>"#, class, highlighted)
            }
            _ => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                class,
                html_escape(code)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_heading_with_id() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Hi");
        assert!(html.contains(r#"<h1 id="hi">Hi</h1>"#));
    }

    #[test]
    fn test_heading_ids_drop_non_word_chars_and_dedupe() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Hello, World!\n\n## Hello World");
        assert!(html.contains(r#"<h2 id="helloworld">Hello, World!</h2>"#));
        assert!(html.contains(r#"<h2 id="helloworld-1">Hello World</h2>"#));
    }

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("This is ~~not~~ a test.");
        assert!(html.contains("<p>This is <del>not</del> a test.</p>"));
    }

    #[test]
    fn test_render_table() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_autolink_bare_url() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("See https://example.com/remote.");
        assert!(html.contains(
            r#"See <a href="https://example.com/remote">https://example.com/remote</a>."#
        ));
    }

    #[test]
    fn test_autolink_skips_links_and_code() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[site](https://example.com)\n\n```\nhttps://example.com\n```");
        assert_eq!(html.matches("<a href").count(), 1);
        assert!(html.contains("<code>https://example.com\n</code>"));
    }

    #[test]
    fn test_code_language_is_escaped_in_class() {
        let renderer = MarkdownRenderer::with_highlighting("base16-ocean.dark");
        let html = renderer.render("```x\"onclick=\"y\ncode\n```");
        assert!(html.contains(r#"class="highlight x&quot;onclick=&quot;y""#));
        assert!(!html.contains(r#"x"onclick"#));
    }

    #[test]
    fn test_render_highlighted_code_block() {
        let renderer = MarkdownRenderer::with_highlighting("base16-ocean.dark");
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("highlight rust"));
        assert!(!html.contains("<code>"));
    }
}
