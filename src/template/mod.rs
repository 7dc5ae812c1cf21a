//! Template module - parsing, evaluation, and fixpoint expansion

mod eval;
mod expand;
mod includes;
mod parser;

use std::collections::BTreeSet;
use thiserror::Error;

pub use eval::{is_truthy, to_output_string, Evaluator, Scope};
pub use expand::{expand, Expansion, MAX_PASSES};
pub use includes::{IncludeGroup, IncludeOrder, IncludeSet};
pub use parser::{parse_expr, Expr, Lexer, Node, Parser, Segment, Token};

/// Template parsing and rendering errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown helper `{name}` at line {line}")]
    UnknownHelper { name: String, line: usize },

    #[error("Include cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),

    #[error("Template did not stabilize after {passes} passes")]
    NotConverged { passes: usize },
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a template source
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let tokens = Lexer::new(source).tokenize();
        let nodes = Parser::new(tokens).parse()?;
        Ok(Self { nodes })
    }

    /// Render once against a scope
    pub fn render(&self, scope: Scope<'_>) -> Result<String, TemplateError> {
        Evaluator::new(scope).render(&self.nodes)
    }

    /// Names this template references as `includes.<name>`
    pub fn include_references(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        parser::collect_includes(&self.nodes, &mut refs);
        refs
    }
}

/// Whether a string contains anything that looks like a template tag
pub fn has_tags(source: &str) -> bool {
    source
        .find("<%")
        .is_some_and(|open| source[open + 2..].contains("%>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Helpers;
    use serde_json::json;

    #[test]
    fn test_template_parse_and_render() {
        let template = Template::parse("<h1><%- content.title %></h1>").unwrap();
        let data = json!({"content": {"title": "Tom & Jerry"}});
        let helpers = Helpers::new();
        assert_eq!(
            template.render(Scope::new(&data, &helpers)).unwrap(),
            "<h1>Tom &amp; Jerry</h1>"
        );
    }

    #[test]
    fn test_has_tags() {
        assert!(has_tags("a <%= b %> c"));
        assert!(!has_tags("plain <p>html</p>"));
        assert!(!has_tags("dangling <% open"));
    }

    #[test]
    fn test_error_messages() {
        let err = TemplateError::IncludeCycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Include cycle: a -> b -> a");
    }
}
