//! Client-side `--filter` and `--order-by` over JSON rows
//!
//! Filters follow the AIP-160 subset the orchestrator APIs accept:
//!
//! ```text
//! name="edge-*" AND NOT status:"error"
//! (region.name=west OR region.name=east) metadata.env=prod
//! serialNumber:*
//! ```
//!
//! `OR` binds tighter than `AND`, and adjacent terms are implicitly AND'ed.

use miette::{Diagnostic, SourceSpan};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    #[error("invalid filter: {message}")]
    #[diagnostic(
        code(orch::filter::syntax),
        help("filters look like: name=\"edge-*\" AND NOT status:error")
    )]
    Syntax {
        #[source_code]
        src: String,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },

    #[error("invalid order-by clause '{0}'")]
    #[diagnostic(
        code(orch::filter::order_by),
        help("use a comma-separated list of fields, each optionally followed by asc or desc")
    )]
    OrderBy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Has,
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        path: String,
        op: Comparator,
        value: String,
    },
    /// Bare term, matched against every scalar in the row
    Search(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Op(Comparator),
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    start: usize,
    len: usize,
}

fn syntax_error(src: &str, start: usize, len: usize, message: impl Into<String>) -> FilterError {
    FilterError::Syntax {
        src: src.to_string(),
        span: (start, len.max(1)).into(),
        message: message.into(),
    }
}

fn tokenize(src: &str) -> Result<Vec<Spanned>, FilterError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' | ')' => {
                let token = if c == '(' { Token::LParen } else { Token::RParen };
                tokens.push(Spanned { token, start, len: 1 });
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    let (_, ch) = chars[i];
                    if ch == '\\' && i + 1 < chars.len() {
                        value.push(chars[i + 1].1);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if ch == quote {
                        closed = true;
                        break;
                    }
                    value.push(ch);
                }
                if !closed {
                    return Err(syntax_error(src, start, src.len() - start, "unterminated string"));
                }
                let end = chars.get(i).map(|(pos, _)| *pos).unwrap_or(src.len());
                tokens.push(Spanned {
                    token: Token::Quoted(value),
                    start,
                    len: end - start,
                });
            }
            '=' | ':' | '<' | '>' | '!' => {
                let next = chars.get(i + 1).map(|(_, ch)| *ch);
                let (op, len) = match (c, next) {
                    ('<', Some('=')) => (Comparator::Le, 2),
                    ('>', Some('=')) => (Comparator::Ge, 2),
                    ('!', Some('=')) => (Comparator::Ne, 2),
                    ('<', _) => (Comparator::Lt, 1),
                    ('>', _) => (Comparator::Gt, 1),
                    ('=', _) => (Comparator::Eq, 1),
                    (':', _) => (Comparator::Has, 1),
                    _ => return Err(syntax_error(src, start, 1, "expected '!='")),
                };
                tokens.push(Spanned {
                    token: Token::Op(op),
                    start,
                    len,
                });
                i += len;
            }
            _ => {
                let mut end = i;
                while end < chars.len() {
                    let ch = chars[end].1;
                    if ch.is_whitespace() || "()=:<>!\"'".contains(ch) {
                        break;
                    }
                    end += 1;
                }
                let stop = chars.get(end).map(|(pos, _)| *pos).unwrap_or(src.len());
                tokens.push(Spanned {
                    token: Token::Word(src[start..stop].to_string()),
                    start,
                    len: stop - start,
                });
                i = end;
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == keyword)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error_here(&self, message: &str) -> FilterError {
        match self.tokens.get(self.pos) {
            Some(t) => syntax_error(self.src, t.start, t.len, message),
            None => syntax_error(self.src, self.src.len().saturating_sub(1), 1, message),
        }
    }

    /// filter := sequence (AND sequence)*
    fn filter(&mut self) -> Result<Expr, FilterError> {
        let mut expr = self.sequence()?;
        while self.peek_keyword("AND") {
            self.pos += 1;
            let rhs = self.sequence()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// sequence := factor factor*
    fn sequence(&mut self) -> Result<Expr, FilterError> {
        let mut expr = self.factor()?;
        while self.starts_term() {
            let rhs = self.factor()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn starts_term(&self) -> bool {
        match self.peek() {
            Some(Token::Word(w)) => w != "AND" && w != "OR",
            Some(Token::LParen) | Some(Token::Quoted(_)) => true,
            _ => false,
        }
    }

    /// factor := term (OR term)*
    fn factor(&mut self) -> Result<Expr, FilterError> {
        let mut expr = self.term()?;
        while self.peek_keyword("OR") {
            self.pos += 1;
            let rhs = self.term()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// term := [NOT | -] simple
    fn term(&mut self) -> Result<Expr, FilterError> {
        if self.peek_keyword("NOT") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.simple()?)));
        }
        if let Some(Token::Word(w)) = self.peek() {
            if w.len() > 1 && w.starts_with('-') {
                let stripped = w[1..].to_string();
                if let Some(t) = self.tokens.get_mut(self.pos) {
                    t.token = Token::Word(stripped);
                    t.start += 1;
                    t.len -= 1;
                }
                return Ok(Expr::Not(Box::new(self.simple()?)));
            }
        }
        self.simple()
    }

    fn simple(&mut self) -> Result<Expr, FilterError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.filter()?;
                match self.next() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(expr),
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        Err(self.error_here("expected ')'"))
                    }
                }
            }
            Some(Token::Word(_)) | Some(Token::Quoted(_)) => self.restriction(),
            _ => Err(self.error_here("expected a field, value or '('")),
        }
    }

    /// restriction := comparable [comparator arg]
    fn restriction(&mut self) -> Result<Expr, FilterError> {
        let lhs = match self.next().map(|t| t.token) {
            Some(Token::Word(w)) => (w, false),
            Some(Token::Quoted(q)) => (q, true),
            _ => return Err(self.error_here("expected a field")),
        };

        let op = match self.peek() {
            Some(Token::Op(op)) => *op,
            _ => return Ok(Expr::Search(lhs.0)),
        };
        if lhs.1 {
            self.pos -= 1;
            return Err(self.error_here("field names cannot be quoted"));
        }
        self.pos += 1;

        let value = match self.next().map(|t| t.token) {
            Some(Token::Word(w)) => w,
            Some(Token::Quoted(q)) => q,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error_here("expected a value after the comparator"));
            }
        };

        Ok(Expr::Compare {
            path: lhs.0,
            op,
            value,
        })
    }
}

/// Parse a filter string
pub fn parse_filter(src: &str) -> Result<Expr, FilterError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(syntax_error(src, 0, 1, "empty filter"));
    }
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
    };
    let expr = parser.filter()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error_here("unexpected token"));
    }
    Ok(expr)
}

/// Resolve a dotted path inside a JSON value
///
/// A segment applied to a list of `{key, value}` objects selects the entry with
/// that key, so `metadata.env` reads `[{"key": "env", "value": "prod"}]`.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items
                .iter()
                .find(|item| item.get("key").and_then(Value::as_str) == Some(segment))
                .and_then(|item| item.get("value"))?,
            _ => return None,
        };
    }
    Some(current)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn wildcard_match(text: &str, pattern: &str) -> bool {
    let prefix = pattern.starts_with('*');
    let suffix = pattern.ends_with('*') && pattern.len() > 1;
    let core = pattern.trim_matches('*');
    match (prefix, suffix) {
        (true, true) => text.contains(core),
        (true, false) => text.ends_with(core),
        (false, true) => text.starts_with(core),
        (false, false) => text == core,
    }
}

fn compare_scalar(field: &Value, op: Comparator, arg: &str) -> bool {
    let Some(text) = scalar_text(field) else {
        return false;
    };

    match op {
        Comparator::Eq | Comparator::Ne => {
            let equal = if arg.contains('*') {
                wildcard_match(&text, arg)
            } else {
                match (as_number(field), arg.parse::<f64>().ok()) {
                    (Some(a), Some(b)) if field.is_number() => a == b,
                    _ => text == arg,
                }
            };
            equal == (op == Comparator::Eq)
        }
        Comparator::Has => text.to_lowercase().contains(&arg.to_lowercase()),
        Comparator::Lt | Comparator::Le | Comparator::Gt | Comparator::Ge => {
            let ordering = match (as_number(field), arg.parse::<f64>().ok()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => Some(text.as_str().cmp(arg)),
            };
            match ordering {
                Some(Ordering::Less) => matches!(op, Comparator::Lt | Comparator::Le),
                Some(Ordering::Equal) => matches!(op, Comparator::Le | Comparator::Ge),
                Some(Ordering::Greater) => matches!(op, Comparator::Gt | Comparator::Ge),
                None => false,
            }
        }
    }
}

fn compare(field: Option<&Value>, op: Comparator, arg: &str) -> bool {
    let field = match field {
        None | Some(Value::Null) => return op == Comparator::Ne,
        Some(v) => v,
    };

    if op == Comparator::Has && arg == "*" {
        return match field {
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            _ => true,
        };
    }

    match field {
        Value::Array(items) => {
            let any = |op| items.iter().any(|item| compare_scalar(item, op, arg));
            if op == Comparator::Ne {
                !any(Comparator::Eq)
            } else {
                any(op)
            }
        }
        Value::Object(map) if op == Comparator::Has => map.contains_key(arg),
        other => compare_scalar(other, op, arg),
    }
}

fn search(value: &Value, needle: &str) -> bool {
    match value {
        Value::Object(map) => map.values().any(|v| search(v, needle)),
        Value::Array(items) => items.iter().any(|v| search(v, needle)),
        other => scalar_text(other).is_some_and(|t| t.to_lowercase().contains(needle)),
    }
}

impl Expr {
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Expr::And(a, b) => a.matches(row) && b.matches(row),
            Expr::Or(a, b) => a.matches(row) || b.matches(row),
            Expr::Not(e) => !e.matches(row),
            Expr::Compare { path, op, value } => compare(resolve_path(row, path), *op, value),
            Expr::Search(term) => search(row, &term.to_lowercase()),
        }
    }
}

/// One `--order-by` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub path: String,
    pub descending: bool,
}

pub fn parse_order_by(src: &str) -> Result<Vec<OrderKey>, FilterError> {
    let mut keys = Vec::new();
    for clause in src.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let mut parts = clause.split_whitespace();
        let path = parts
            .next()
            .ok_or_else(|| FilterError::OrderBy(clause.to_string()))?;
        let descending = match parts.next().map(str::to_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(_) => return Err(FilterError::OrderBy(clause.to_string())),
        };
        if parts.next().is_some() {
            return Err(FilterError::OrderBy(clause.to_string()));
        }
        keys.push(OrderKey {
            path: path.to_string(),
            descending,
        });
    }
    if keys.is_empty() {
        return Err(FilterError::OrderBy(src.to_string()));
    }
    Ok(keys)
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            _ => {
                let x = scalar_text(a).unwrap_or_else(|| a.to_string());
                let y = scalar_text(b).unwrap_or_else(|| b.to_string());
                x.cmp(&y)
            }
        },
        _ => Ordering::Equal,
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Stable multi-key sort; rows missing a key go last in either direction
pub fn sort_rows(rows: &mut [Value], keys: &[OrderKey]) {
    rows.sort_by(|a, b| {
        for key in keys {
            let x = present(resolve_path(a, &key.path));
            let y = present(resolve_path(b, &key.path));
            let ordering = match (x, y) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                _ => {
                    let o = compare_field(x, y);
                    if key.descending {
                        o.reverse()
                    } else {
                        o
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Apply optional `--filter` and `--order-by` to a list of rows
pub fn apply(
    rows: Vec<Value>,
    filter: Option<&str>,
    order_by: Option<&str>,
) -> Result<Vec<Value>, FilterError> {
    let mut rows = match filter.filter(|f| !f.trim().is_empty()) {
        Some(f) => {
            let expr = parse_filter(f)?;
            rows.into_iter().filter(|r| expr.matches(r)).collect()
        }
        None => rows,
    };
    if let Some(order) = order_by.filter(|o| !o.trim().is_empty()) {
        let keys = parse_order_by(order)?;
        sort_rows(&mut rows, &keys);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hosts() -> Vec<Value> {
        vec![
            json!({
                "name": "edge-01", "cpuCores": 8, "status": "running",
                "site": {"name": "sj-lab"},
                "metadata": [{"key": "env", "value": "prod"}],
                "tags": ["gpu", "rt"]
            }),
            json!({
                "name": "edge-02", "cpuCores": 16, "status": "error",
                "site": {"name": "pdx"},
                "metadata": [{"key": "env", "value": "dev"}]
            }),
            json!({"name": "core-1", "cpuCores": 4, "status": "running"}),
        ]
    }

    fn names(filter: &str) -> Vec<String> {
        apply(hosts(), Some(filter), None)
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_equality_and_wildcards() {
        assert_eq!(names("name=edge-01"), vec!["edge-01"]);
        assert_eq!(names("name=\"edge-*\""), vec!["edge-01", "edge-02"]);
        assert_eq!(names("name=*-1"), vec!["core-1"]);
        assert_eq!(names("status!=running"), vec!["edge-02"]);
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(names("cpuCores>=8"), vec!["edge-01", "edge-02"]);
        // 16 > 8 numerically even though "16" < "8" as strings
        assert_eq!(names("cpuCores>8"), vec!["edge-02"]);
        assert_eq!(names("cpuCores=4"), vec!["core-1"]);
    }

    #[test]
    fn test_boolean_operators_and_precedence() {
        assert_eq!(names("status=running AND NOT name=core-1"), vec!["edge-01"]);
        assert_eq!(names("status=running -name=core-1"), vec!["edge-01"]);
        // OR binds tighter than AND
        assert_eq!(
            names("status=running AND name=edge-01 OR name=core-1"),
            vec!["edge-01", "core-1"]
        );
        assert_eq!(
            names("(site.name=pdx OR site.name=sj-lab) cpuCores<10"),
            vec!["edge-01"]
        );
    }

    #[test]
    fn test_has_presence_and_metadata() {
        assert_eq!(names("site:*"), vec!["edge-01", "edge-02"]);
        assert_eq!(names("NOT site:*"), vec!["core-1"]);
        assert_eq!(names("metadata.env=prod"), vec!["edge-01"]);
        assert_eq!(names("tags:gpu"), vec!["edge-01"]);
        assert_eq!(names("status:ERR"), vec!["edge-02"]);
    }

    #[test]
    fn test_bare_term_searches_all_fields() {
        assert_eq!(names("PDX"), vec!["edge-02"]);
        assert_eq!(names("\"sj-lab\""), vec!["edge-01"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_filter("name=").is_err());
        assert!(parse_filter("(name=a").is_err());
        assert!(parse_filter("name=\"open").is_err());
        assert!(parse_filter("").is_err());
        assert!(parse_filter("a ! b").is_err());
        assert!(parse_filter("name=a)").is_err());
    }

    #[test]
    fn test_order_by() {
        let rows = apply(hosts(), None, Some("status desc, cpuCores")).unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(order, vec!["core-1", "edge-01", "edge-02"]);

        let rows = apply(hosts(), None, Some("site.name")).unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        // missing site sorts last
        assert_eq!(order, vec!["edge-02", "edge-01", "core-1"]);

        assert!(parse_order_by("name sideways").is_err());
        assert!(parse_order_by(" , ").is_err());
    }
}
