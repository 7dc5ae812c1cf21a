//! Helper functions for templates
//!
//! These are callable from template expressions, e.g.
//! `<%= shortDate(content.published) %>` or `<%= striptags(content.abstract) %>`.

mod date;
mod html;

use serde_json::Value;
use std::collections::HashMap;

pub use date::*;
pub use html::*;

/// Signature of a template helper
pub type HelperFn = fn(&[Value]) -> Value;

/// Registry of helper functions available to templates
#[derive(Clone)]
pub struct Helpers {
    functions: HashMap<&'static str, HelperFn>,
}

impl Helpers {
    /// Registry with the built-in helpers
    pub fn new() -> Self {
        let mut helpers = Self::empty();
        helpers.register("shortDate", short_date_helper);
        helpers.register("formatDate", format_date_helper);
        helpers.register("striptags", striptags_helper);
        helpers.register("escape", escape_helper);
        helpers
    }

    /// Registry without any helpers
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, function: HelperFn) {
        self.functions.insert(name, function);
    }

    pub fn get(&self, name: &str) -> Option<HelperFn> {
        self.functions.get(name).copied()
    }

    /// Registered helper names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Helpers {
    fn default() -> Self {
        Self::new()
    }
}

/// String form of a helper argument; missing and null are empty
fn arg_str(args: &[Value], index: usize) -> String {
    match args.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn short_date_helper(args: &[Value]) -> Value {
    let Some(value) = args.first() else {
        return Value::Null;
    };
    match parse_date(value) {
        Some(date) => Value::String(short_date(&date)),
        None => value.clone(),
    }
}

fn format_date_helper(args: &[Value]) -> Value {
    let Some(value) = args.first() else {
        return Value::Null;
    };
    let format = args
        .get(1)
        .and_then(Value::as_str)
        .unwrap_or("YYYY-MM-DD");
    match parse_date(value) {
        Some(date) => Value::String(format_date(&date, format)),
        None => value.clone(),
    }
}

fn striptags_helper(args: &[Value]) -> Value {
    Value::String(strip_tags(&arg_str(args, 0)))
}

fn escape_helper(args: &[Value]) -> Value {
    Value::String(html_escape(&arg_str(args, 0)))
}
