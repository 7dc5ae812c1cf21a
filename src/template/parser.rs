//! Template lexer and parser
//!
//! Templates are plain text with embedded tags:
//!
//! | Tag                    | Meaning                         |
//! |------------------------|---------------------------------|
//! | `<%= expr %>`          | interpolate, raw                |
//! | `<%- expr %>`          | interpolate, HTML-escaped       |
//! | `<%# ... %>`           | comment                         |
//! | `<% if expr %>`        | conditional (`else`, `endif`)   |
//! | `<% for x in expr %>`  | loop (`endfor`)                 |
//!
//! Expressions are deliberately small:
//!
//! ```text
//! expr    := '!' expr | primary
//! primary := string | number | 'true' | 'false' | 'null' | call | path
//! call    := ident '(' [expr (',' expr)*] ')'
//! path    := ident ('.' ident | '[' number ']' | '[' string ']')*
//! ```

use serde_json::Value;
use std::collections::BTreeSet;

use super::TemplateError;

// ============================================================================
// Lexer
// ============================================================================

/// Tokens produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Raw text content
    Text(String),
    /// `<%= ... %>`
    Interpolate { code: String, line: usize },
    /// `<%- ... %>`
    Escape { code: String, line: usize },
    /// `<% ... %>`
    Statement { code: String, line: usize },
    /// `<%# ... %>`
    Comment,
}

/// Splits a template into text and tags
pub struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    line: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
        }
    }

    /// Tokenize the entire input. An unterminated `<%` is kept as text.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut text = String::new();

        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            let Some(open) = rest.find("<%") else {
                text.push_str(rest);
                break;
            };
            let Some(close) = rest[open + 2..].find("%>") else {
                text.push_str(rest);
                break;
            };

            text.push_str(&rest[..open]);
            if !text.is_empty() {
                tokens.push(Token::Text(std::mem::take(&mut text)));
            }
            self.line += rest[..open].matches('\n').count();

            let inner = &rest[open + 2..open + 2 + close];
            let line = self.line;
            let token = match inner.chars().next() {
                Some('=') => Token::Interpolate {
                    code: inner[1..].trim().to_string(),
                    line,
                },
                Some('-') => Token::Escape {
                    code: inner[1..].trim().to_string(),
                    line,
                },
                Some('#') => Token::Comment,
                _ => Token::Statement {
                    code: inner.trim().to_string(),
                    line,
                },
            };
            tokens.push(token);

            self.line += inner.matches('\n').count();
            self.pos += open + 2 + close + 2;
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        tokens
    }
}

// ============================================================================
// AST
// ============================================================================

/// One step of a path lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Root identifier followed by property/index segments
    Path { root: String, segments: Vec<Segment> },
    Call { name: String, args: Vec<Expr> },
    Not(Box<Expr>),
}

impl Expr {
    /// Collect `includes.<name>` references
    fn collect_includes(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Path { root, segments } if root == "includes" => {
                if let Some(Segment::Key(name)) = segments.first() {
                    out.insert(name.clone());
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_includes(out);
                }
            }
            Expr::Not(inner) => inner.collect_includes(out),
            _ => {}
        }
    }
}

/// Template AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Interpolate { expr: Expr, line: usize },
    Escape { expr: Expr, line: usize },
    If {
        condition: Expr,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
        line: usize,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Node>,
        line: usize,
    },
}

/// Collect `includes.<name>` references from a node list
pub(crate) fn collect_includes(nodes: &[Node], out: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Interpolate { expr, .. } | Node::Escape { expr, .. } => {
                expr.collect_includes(out)
            }
            Node::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                condition.collect_includes(out);
                collect_includes(then_branch, out);
                collect_includes(else_branch, out);
            }
            Node::For { iterable, body, .. } => {
                iterable.collect_includes(out);
                collect_includes(body, out);
            }
        }
    }
}

// ============================================================================
// Parser - Tokens to AST
// ============================================================================

/// Block statement inside `<% ... %>`
enum Statement {
    If(Expr),
    Else,
    EndIf,
    For(String, Expr),
    EndFor,
}

/// Parser that converts tokens to AST
pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }

    /// Parse tokens into AST nodes
    pub fn parse(mut self) -> Result<Vec<Node>, TemplateError> {
        let (nodes, terminator) = self.parse_nodes()?;
        match terminator {
            None => Ok(nodes),
            Some((_, line)) => Err(TemplateError::Parse {
                line,
                message: "unexpected block terminator".to_string(),
            }),
        }
    }

    /// Parse until end of input or a block terminator (`else`, `endif`, `endfor`)
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Option<(Statement, usize)>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Comment => {}
                Token::Interpolate { code, line } => nodes.push(Node::Interpolate {
                    expr: parse_expr(&code, line)?,
                    line,
                }),
                Token::Escape { code, line } => nodes.push(Node::Escape {
                    expr: parse_expr(&code, line)?,
                    line,
                }),
                Token::Statement { code, line } => match parse_statement(&code, line)? {
                    Statement::If(condition) => nodes.push(self.parse_if(condition, line)?),
                    Statement::For(var, iterable) => {
                        nodes.push(self.parse_for(var, iterable, line)?)
                    }
                    terminator => return Ok((nodes, Some((terminator, line)))),
                },
            }
        }

        Ok((nodes, None))
    }

    fn parse_if(&mut self, condition: Expr, line: usize) -> Result<Node, TemplateError> {
        let (then_branch, terminator) = self.parse_nodes()?;
        let else_branch = match terminator {
            Some((Statement::EndIf, _)) => Vec::new(),
            Some((Statement::Else, _)) => match self.parse_nodes()? {
                (nodes, Some((Statement::EndIf, _))) => nodes,
                _ => return Err(unclosed("if", line)),
            },
            _ => return Err(unclosed("if", line)),
        };
        Ok(Node::If {
            condition,
            then_branch,
            else_branch,
            line,
        })
    }

    fn parse_for(&mut self, var: String, iterable: Expr, line: usize) -> Result<Node, TemplateError> {
        match self.parse_nodes()? {
            (body, Some((Statement::EndFor, _))) => Ok(Node::For {
                var,
                iterable,
                body,
                line,
            }),
            _ => Err(unclosed("for", line)),
        }
    }
}

fn unclosed(block: &str, line: usize) -> TemplateError {
    TemplateError::Parse {
        line,
        message: format!("unclosed `{}` block", block),
    }
}

fn parse_statement(code: &str, line: usize) -> Result<Statement, TemplateError> {
    let (keyword, rest) = match code.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (code, ""),
    };

    match keyword {
        "if" => Ok(Statement::If(parse_expr(rest, line)?)),
        "else" if rest.is_empty() => Ok(Statement::Else),
        "endif" if rest.is_empty() => Ok(Statement::EndIf),
        "endfor" if rest.is_empty() => Ok(Statement::EndFor),
        "for" => {
            let (var, iterable) = rest.split_once(" in ").ok_or_else(|| TemplateError::Parse {
                line,
                message: format!("expected `for <name> in <expr>`, found `{}`", code),
            })?;
            let var = var.trim();
            if !is_identifier(var) {
                return Err(TemplateError::Parse {
                    line,
                    message: format!("invalid loop variable `{}`", var),
                });
            }
            Ok(Statement::For(var.to_string(), parse_expr(iterable, line)?))
        }
        _ => Err(TemplateError::Parse {
            line,
            message: format!("unknown statement `{}`", code),
        }),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

// ============================================================================
// Expression parser
// ============================================================================

/// Parse a complete expression
pub fn parse_expr(code: &str, line: usize) -> Result<Expr, TemplateError> {
    let mut parser = ExprParser {
        chars: code.chars().collect(),
        pos: 0,
        line,
    };
    let expr = parser.expr()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error(format!("unexpected input in `{}`", code)));
    }
    Ok(expr)
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl ExprParser {
    fn expr(&mut self) -> Result<Expr, TemplateError> {
        self.skip_whitespace();
        if self.eat('!') {
            return Ok(Expr::Not(Box::new(self.expr()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, TemplateError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => Ok(Expr::Literal(Value::String(self.string(quote)?))),
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                let name = self.identifier();
                match name.as_str() {
                    "true" => return Ok(Expr::Literal(Value::Bool(true))),
                    "false" => return Ok(Expr::Literal(Value::Bool(false))),
                    "null" | "undefined" => return Ok(Expr::Literal(Value::Null)),
                    _ => {}
                }
                self.skip_whitespace();
                if self.eat('(') {
                    let args = self.arguments()?;
                    return Ok(Expr::Call { name, args });
                }
                let segments = self.segments()?;
                Ok(Expr::Path {
                    root: name,
                    segments,
                })
            }
            Some(c) => Err(self.error(format!("unexpected character `{}`", c))),
            None => Err(self.error("empty expression".to_string())),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.eat(')') {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            self.skip_whitespace();
            if self.eat(')') {
                return Ok(args);
            }
            if !self.eat(',') {
                return Err(self.error("expected `,` or `)` in call".to_string()));
            }
        }
    }

    fn segments(&mut self) -> Result<Vec<Segment>, TemplateError> {
        let mut segments = Vec::new();
        loop {
            if self.eat('.') {
                let key = self.identifier();
                if key.is_empty() {
                    return Err(self.error("expected property name after `.`".to_string()));
                }
                segments.push(Segment::Key(key));
            } else if self.eat('[') {
                self.skip_whitespace();
                let segment = match self.peek() {
                    Some(quote @ ('"' | '\'')) => Segment::Key(self.string(quote)?),
                    Some(c) if c.is_ascii_digit() => {
                        let digits = self.take_while(|c| c.is_ascii_digit());
                        Segment::Index(
                            digits
                                .parse()
                                .map_err(|_| self.error(format!("invalid index `{}`", digits)))?,
                        )
                    }
                    _ => return Err(self.error("expected index or quoted key".to_string())),
                };
                self.skip_whitespace();
                if !self.eat(']') {
                    return Err(self.error("expected `]`".to_string()));
                }
                segments.push(segment);
            } else {
                return Ok(segments);
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, TemplateError> {
        self.pos += 1;
        let mut result = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        self.pos += 1;
                        result.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                c if c == quote => return Ok(result),
                c => result.push(c),
            }
        }
        Err(self.error("unterminated string literal".to_string()))
    }

    fn number(&mut self) -> Result<Expr, TemplateError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        self.take_while(|c| c.is_ascii_digit() || c == '.');
        let text: String = self.chars[start..self.pos].iter().collect();
        let number: f64 = text
            .parse()
            .map_err(|_| self.error(format!("invalid number `{}`", text)))?;
        let value = if number.fract() == 0.0 && !text.contains('.') {
            Value::from(number as i64)
        } else {
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        };
        Ok(Expr::Literal(value))
    }

    fn identifier(&mut self) -> String {
        self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '$')
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: String) -> TemplateError {
        TemplateError::Parse {
            line: self.line,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
        Parser::new(Lexer::new(source).tokenize()).parse()
    }

    #[test]
    fn test_lexer_simple() {
        let tokens = Lexer::new("Hello <%= name %>!").tokenize();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], Token::Text(t) if t == "Hello "));
        assert!(matches!(&tokens[1], Token::Interpolate { code, .. } if code == "name"));
        assert!(matches!(&tokens[2], Token::Text(t) if t == "!"));
    }

    #[test]
    fn test_lexer_tag_kinds_and_lines() {
        let tokens = Lexer::new("<%- a %>\n<%# note %>\n<% if b %>").tokenize();
        assert!(matches!(&tokens[0], Token::Escape { code, line: 1 } if code == "a"));
        assert_eq!(tokens[2], Token::Comment);
        assert!(matches!(&tokens[4], Token::Statement { code, line: 3 } if code == "if b"));
    }

    #[test]
    fn test_lexer_unterminated_tag_is_text() {
        let tokens = Lexer::new("a <% b").tokenize();
        assert_eq!(tokens, vec![Token::Text("a <% b".to_string())]);
    }

    #[test]
    fn test_parse_expressions() {
        assert_eq!(
            parse_expr("content.hero.file.url", 1).unwrap(),
            Expr::Path {
                root: "content".to_string(),
                segments: vec![
                    Segment::Key("hero".to_string()),
                    Segment::Key("file".to_string()),
                    Segment::Key("url".to_string()),
                ],
            }
        );
        assert_eq!(
            parse_expr("collections['main menu'][0]", 1).unwrap(),
            Expr::Path {
                root: "collections".to_string(),
                segments: vec![Segment::Key("main menu".to_string()), Segment::Index(0)],
            }
        );
        assert_eq!(
            parse_expr("formatDate(build.time, 'YYYY')", 1).unwrap(),
            Expr::Call {
                name: "formatDate".to_string(),
                args: vec![
                    Expr::Path {
                        root: "build".to_string(),
                        segments: vec![Segment::Key("time".to_string())],
                    },
                    Expr::Literal(json!("YYYY")),
                ],
            }
        );
        assert_eq!(
            parse_expr("!false", 1).unwrap(),
            Expr::Not(Box::new(Expr::Literal(json!(false))))
        );
        assert_eq!(parse_expr("42", 1).unwrap(), Expr::Literal(json!(42)));
    }

    #[test]
    fn test_parse_expression_errors() {
        assert!(parse_expr("", 1).is_err());
        assert!(parse_expr("a b", 1).is_err());
        assert!(parse_expr("f(a", 1).is_err());
        assert!(parse_expr("'open", 1).is_err());
    }

    #[test]
    fn test_parse_blocks() {
        let nodes = parse("<% if a %>x<% else %>y<% endif %><% for p in posts %><%= p %><% endfor %>")
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], Node::If { then_branch, else_branch, .. }
            if then_branch.len() == 1 && else_branch.len() == 1));
        assert!(matches!(&nodes[1], Node::For { var, body, .. } if var == "p" && body.len() == 1));
    }

    #[test]
    fn test_parse_block_errors() {
        let err = parse("a\n<% if x %>never closed").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { line: 2, .. }));
        assert!(parse("<% endfor %>").is_err());
        assert!(parse("<% for in posts %><% endfor %>").is_err());
        assert!(parse("<% posts.forEach(p => { %>").is_err());
    }

    #[test]
    fn test_collect_includes() {
        let nodes = parse(
            "<%= includes.header %><% if includes.nav %><%= striptags(includes.footer) %><% endif %>",
        )
        .unwrap();
        let mut refs = BTreeSet::new();
        collect_includes(&nodes, &mut refs);
        let refs: Vec<_> = refs.into_iter().collect();
        assert_eq!(refs, vec!["footer", "header", "nav"]);
    }
}
