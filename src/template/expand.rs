//! Fixpoint expansion: render until the output stops changing

use super::{has_tags, Scope, Template, TemplateError};

/// Ceiling on substitution passes per expansion
pub const MAX_PASSES: usize = 10;

/// Result of expanding a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub output: String,
    /// Substitution passes performed
    pub passes: usize,
    /// False when the pass ceiling was hit before a fixpoint
    pub converged: bool,
}

/// Expand a template against a scope.
///
/// Each pass parses and renders the previous output. Expansion stops when a
/// pass changes nothing, when no tags remain, or after [`MAX_PASSES`] passes.
/// Hitting the ceiling is not an error: the last output is returned with
/// `converged == false` and a warning is logged.
pub fn expand(template: &str, scope: Scope<'_>) -> Result<Expansion, TemplateError> {
    let mut current = template.to_string();

    for pass in 0..MAX_PASSES {
        if !has_tags(&current) {
            return Ok(Expansion {
                output: current,
                passes: pass,
                converged: true,
            });
        }

        let next = Template::parse(&current)?.render(scope)?;
        if next == current {
            return Ok(Expansion {
                output: next,
                passes: pass + 1,
                converged: true,
            });
        }
        current = next;
    }

    tracing::warn!("Reached maximum nesting level ({} passes)", MAX_PASSES);
    Ok(Expansion {
        output: current,
        passes: MAX_PASSES,
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::Helpers;
    use serde_json::{json, Value};

    fn run(template: &str, data: &Value) -> Expansion {
        let helpers = Helpers::new();
        expand(template, Scope::new(data, &helpers)).unwrap()
    }

    #[test]
    fn test_no_tags_is_zero_pass_identity() {
        let expansion = run("<p>plain</p>", &json!({}));
        assert_eq!(expansion.output, "<p>plain</p>");
        assert_eq!(expansion.passes, 0);
        assert!(expansion.converged);
    }

    #[test]
    fn test_nested_expressions_resolve_transitively() {
        let data = json!({
            "includes": {"header": "<h1><%= content.title %></h1>"},
            "content": {"title": "Remote"}
        });
        let expansion = run("<%= includes.header %>", &data);
        assert_eq!(expansion.output, "<h1>Remote</h1>");
        assert_eq!(expansion.passes, 2);
        assert!(expansion.converged);
    }

    #[test]
    fn test_fixpoint_is_idempotent() {
        let data = json!({
            "includes": {"nav": "<nav><%= config.webHost %></nav>"},
            "config": {"webHost": "https://example.com"}
        });
        let once = run("<body><%= includes.nav %></body>", &data);
        let twice = run(&once.output, &data);
        assert_eq!(once.output, twice.output);
    }

    #[test]
    fn test_self_reproducing_template_stops_at_ceiling() {
        // Every pass emits the tag again with one more character.
        let data = json!({"grow": "x<%= grow %>"});
        let expansion = run("<%= grow %>", &data);
        assert!(!expansion.converged);
        assert_eq!(expansion.passes, MAX_PASSES);
        assert!(expansion.output.starts_with("xxxxxxxxx"));
    }

    #[test]
    fn test_stable_self_reference_converges() {
        let data = json!({"loop": "<%= loop %>"});
        let expansion = run("<%= loop %>", &data);
        assert!(expansion.converged);
        assert_eq!(expansion.output, "<%= loop %>");
        assert_eq!(expansion.passes, 1);
    }

    #[test]
    fn test_undefined_expression_renders_empty() {
        let expansion = run("a<%= nothing.here %>b", &json!({}));
        assert_eq!(expansion.output, "ab");
        assert!(expansion.converged);
    }

    #[test]
    fn test_parse_error_propagates() {
        let helpers = Helpers::new();
        let data = json!({});
        assert!(expand("<% if x %>", Scope::new(&data, &helpers)).is_err());
    }
}
