//! Statement templates: placeholder substitution and statement splitting.
//!
//! A template is SQL text with `{...}` placeholders:
//!
//! | Form        | Substitution                  |
//! |-------------|-------------------------------|
//! | `{path}`    | value-quoted                  |
//! | `{!path}`   | identifier-quoted             |
//! | `{?path}`   | raw, unescaped                |
//!
//! Paths are dotted (`{filter.where.id}`). Text inside quoted literals is never
//! scanned for placeholders, so `'{not a placeholder}'` survives untouched.
//!
//! # Example
//!
//! ```ignore
//! use sqlweave::{template, Context, Dialect};
//!
//! let ctx = Context::new().with("id", 7).with("table", "users");
//! let sql = template::apply("SELECT * FROM {!table} WHERE id = {id}", &ctx, &Dialect::standard());
//! assert_eq!(sql, "SELECT * FROM `users` WHERE id = 7");
//! ```

use crate::context::Context;
use crate::dialect::{Dialect, EscapeStyle};

/// How a placeholder's resolved value is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderMode {
    Value,
    Identifier,
    Raw,
}

/// A parsed `{...}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub mode: PlaceholderMode,
    pub path: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InLiteral(char),
}

/// Tracks literal boundaries one character at a time.
struct Scanner<'d> {
    dialect: &'d Dialect,
    state: ScanState,
    escaped: bool,
}

impl<'d> Scanner<'d> {
    fn new(dialect: &'d Dialect) -> Self {
        Self {
            dialect,
            state: ScanState::Normal,
            escaped: false,
        }
    }

    fn in_literal(&self) -> bool {
        matches!(self.state, ScanState::InLiteral(_))
    }

    /// Backslash escapes only exist under [`EscapeStyle::Backslash`]; with
    /// quote doubling a `''` pair closes and reopens the literal.
    fn feed(&mut self, ch: char) {
        let escaped = self.escaped;
        self.escaped = ch == '\\' && !escaped && self.dialect.escape == EscapeStyle::Backslash;
        if escaped {
            return;
        }
        self.state = match self.state {
            ScanState::Normal if self.dialect.is_literal_delimiter(ch) => ScanState::InLiteral(ch),
            ScanState::InLiteral(delim) if ch == delim => ScanState::Normal,
            state => state,
        };
    }
}

/// Parse a placeholder at the start of `s` (which begins with `{`).
///
/// Returns the byte length consumed (including both braces).
fn parse_placeholder(s: &str) -> Option<(usize, Placeholder<'_>)> {
    let close = s.find('}')?;
    let body = &s[1..close];
    let (mode, path) = match body.chars().next()? {
        '!' => (PlaceholderMode::Identifier, &body[1..]),
        '?' => (PlaceholderMode::Raw, &body[1..]),
        _ => (PlaceholderMode::Value, body),
    };
    let well_formed = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    well_formed.then_some((close + 1, Placeholder { mode, path }))
}

/// Substitute every placeholder in `template` from `context`.
///
/// Missing paths resolve to null (`NULL` when value-quoted). Never fails.
pub fn apply(template: &str, context: &Context, dialect: &Dialect) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut scanner = Scanner::new(dialect);
    let mut skip_until = 0;

    for (i, ch) in template.char_indices() {
        if i < skip_until {
            continue;
        }
        if ch == '{' && !scanner.in_literal() {
            if let Some((len, placeholder)) = parse_placeholder(&template[i..]) {
                let value = context.resolve(placeholder.path);
                match placeholder.mode {
                    PlaceholderMode::Value => out.push_str(&dialect.quote_value(&value)),
                    PlaceholderMode::Identifier => {
                        out.push_str(&dialect.quote_identifier(&value))
                    }
                    PlaceholderMode::Raw => out.push_str(&value.to_raw_string()),
                }
                skip_until = i + len;
                scanner.escaped = false;
                continue;
            }
        }
        scanner.feed(ch);
        out.push(ch);
    }
    out
}

/// Placeholders found outside literals, in template order.
pub fn placeholders<'a>(template: &'a str, dialect: &Dialect) -> Vec<Placeholder<'a>> {
    let mut found = Vec::new();
    let mut scanner = Scanner::new(dialect);
    let mut skip_until = 0;
    for (i, ch) in template.char_indices() {
        if i < skip_until {
            continue;
        }
        if ch == '{' && !scanner.in_literal() {
            if let Some((len, placeholder)) = parse_placeholder(&template[i..]) {
                found.push(placeholder);
                skip_until = i + len;
                continue;
            }
        }
        scanner.feed(ch);
    }
    found
}

/// Split multi-statement text on the dialect's separator, ignoring separators
/// inside literals. Pieces are trimmed; empty pieces are dropped.
pub fn split_statements(text: &str, dialect: &Dialect) -> Vec<String> {
    let mut statements = Vec::new();
    let mut scanner = Scanner::new(dialect);
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if ch == dialect.statement_separator && !scanner.in_literal() && !scanner.escaped {
            push_trimmed(&mut statements, &text[start..i]);
            start = i + ch.len_utf8();
            scanner.escaped = false;
            continue;
        }
        scanner.feed(ch);
    }
    push_trimmed(&mut statements, &text[start..]);
    statements
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
