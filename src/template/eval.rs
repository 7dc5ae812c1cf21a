//! Template evaluator

use serde_json::Value;

use super::parser::{Expr, Node, Segment};
use super::TemplateError;
use crate::helpers::{html_escape, Helpers};

/// Data and helpers a template renders against
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub data: &'a Value,
    pub helpers: &'a Helpers,
}

impl<'a> Scope<'a> {
    pub fn new(data: &'a Value, helpers: &'a Helpers) -> Self {
        Self { data, helpers }
    }
}

/// Renders AST nodes against a scope
pub struct Evaluator<'a> {
    scope: Scope<'a>,
    locals: Vec<(String, Value)>,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: Scope<'a>) -> Self {
        Self {
            scope,
            locals: Vec::new(),
        }
    }

    /// Render AST nodes to string
    pub fn render(&mut self, nodes: &[Node]) -> Result<String, TemplateError> {
        let mut output = String::new();
        self.render_nodes(nodes, &mut output)?;
        Ok(output)
    }

    fn render_nodes(&mut self, nodes: &[Node], output: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            self.render_node(node, output)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node, output: &mut String) -> Result<(), TemplateError> {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Interpolate { expr, line } => {
                let value = self.evaluate(expr, *line)?;
                output.push_str(&to_output_string(&value));
            }
            Node::Escape { expr, line } => {
                let value = self.evaluate(expr, *line)?;
                output.push_str(&html_escape(&to_output_string(&value)));
            }
            Node::If {
                condition,
                then_branch,
                else_branch,
                line,
            } => {
                if is_truthy(&self.evaluate(condition, *line)?) {
                    self.render_nodes(then_branch, output)?;
                } else {
                    self.render_nodes(else_branch, output)?;
                }
            }
            Node::For {
                var,
                iterable,
                body,
                line,
            } => {
                let items = match self.evaluate(iterable, *line)? {
                    Value::Array(items) => items,
                    Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
                    _ => Vec::new(),
                };
                for item in items {
                    self.locals.push((var.clone(), item));
                    let result = self.render_nodes(body, output);
                    self.locals.pop();
                    result?;
                }
            }
        }
        Ok(())
    }

    /// Evaluate an expression. Undefined lookups yield `Null`.
    pub fn evaluate(&self, expr: &Expr, line: usize) -> Result<Value, TemplateError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&self.evaluate(inner, line)?))),
            Expr::Path { root, segments } => Ok(self.lookup(root, segments)),
            Expr::Call { name, args } => {
                let function =
                    self.scope
                        .helpers
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownHelper {
                            name: name.clone(),
                            line,
                        })?;
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, line))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(function(&args))
            }
        }
    }

    fn lookup(&self, root: &str, segments: &[Segment]) -> Value {
        let base = self
            .locals
            .iter()
            .rev()
            .find(|(name, _)| name == root)
            .map(|(_, value)| value)
            .or_else(|| self.scope.data.get(root));

        let mut current = match base {
            Some(value) => value,
            None => return Value::Null,
        };

        for segment in segments {
            let next = match (segment, current) {
                (Segment::Key(key), Value::Array(items)) if key == "length" => {
                    return Value::from(items.len());
                }
                (Segment::Key(key), Value::String(s)) if key == "length" => {
                    return Value::from(s.chars().count());
                }
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Value::Null,
            }
        }

        current.clone()
    }
}

/// Convert a value to its output form
pub fn to_output_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // Floats print like JS numbers: 1.0 -> "1"
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_output_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Check if a value is truthy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
