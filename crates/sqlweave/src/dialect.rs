//! Dialect configuration: quote characters, separators and escaping.
//!
//! A [`Dialect`] is plain data and can be deserialized from application config:
//!
//! ```ignore
//! let dialect: sqlweave::Dialect = serde_json::from_str(r#"{"identifier_quote": "\""}"#)?;
//! ```

use crate::quote;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// How string literals are escaped before being wrapped in the value quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeStyle {
    /// MySQL style: backslash-escape quotes, backslashes and control characters.
    #[default]
    Backslash,
    /// Standard SQL style: double the value quote, nothing else.
    Double,
}

/// Dialect settings shared by quoting, template application and statement splitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// Wraps text values (default `'`).
    pub value_quote: char,
    /// Wraps identifier segments (default `` ` ``).
    pub identifier_quote: char,
    /// Separates identifier segments (default `.`).
    pub namespace_separator: char,
    /// Characters opening a literal the template scanner must skip over.
    pub literal_delimiters: Vec<char>,
    /// Separates statements in multi-statement text (default `;`).
    pub statement_separator: char,
    pub escape: EscapeStyle,
    /// Render booleans as `TRUE`/`FALSE` instead of `1`/`0`.
    pub bool_keywords: bool,
    /// Truncate SQL in debug logs (in bytes). `None` disables truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            value_quote: '\'',
            identifier_quote: '`',
            namespace_separator: '.',
            literal_delimiters: vec!['\'', '"', '`'],
            statement_separator: ';',
            escape: EscapeStyle::Backslash,
            bool_keywords: false,
            max_logged_sql: Some(200),
        }
    }
}

impl Dialect {
    /// Backtick identifiers, backslash escaping.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Double-quoted identifiers, `''` escaping (standard_conforming_strings)
    /// and `TRUE`/`FALSE` booleans.
    pub fn postgres() -> Self {
        Self {
            identifier_quote: '"',
            escape: EscapeStyle::Double,
            bool_keywords: true,
            ..Self::default()
        }
    }

    pub fn with_value_quote(mut self, quote: char) -> Self {
        self.value_quote = quote;
        self
    }

    pub fn with_identifier_quote(mut self, quote: char) -> Self {
        self.identifier_quote = quote;
        self
    }

    pub fn with_namespace_separator(mut self, separator: char) -> Self {
        self.namespace_separator = separator;
        self
    }

    pub fn with_statement_separator(mut self, separator: char) -> Self {
        self.statement_separator = separator;
        self
    }

    pub fn with_escape(mut self, escape: EscapeStyle) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_bool_keywords(mut self, enabled: bool) -> Self {
        self.bool_keywords = enabled;
        self
    }

    pub fn with_max_logged_sql(mut self, max: Option<usize>) -> Self {
        self.max_logged_sql = max;
        self
    }

    pub(crate) fn is_literal_delimiter(&self, ch: char) -> bool {
        self.literal_delimiters.contains(&ch)
    }

    /// Minimal escaping of a text value, without the surrounding quotes.
    pub fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 2);
        match self.escape {
            EscapeStyle::Double => {
                for ch in text.chars() {
                    if ch == self.value_quote {
                        out.push(ch);
                    }
                    out.push(ch);
                }
            }
            EscapeStyle::Backslash => {
                for ch in text.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\x1a' => out.push_str("\\Z"),
                        '\'' | '"' => {
                            out.push('\\');
                            out.push(ch);
                        }
                        c if c == self.value_quote => {
                            out.push('\\');
                            out.push(c);
                        }
                        c => out.push(c),
                    }
                }
            }
        }
        out
    }

    /// See [`quote::quote_value`].
    pub fn quote_value(&self, value: &Value) -> String {
        quote::quote_value(value, self)
    }

    /// See [`quote::quote_identifier`].
    pub fn quote_identifier(&self, value: &Value) -> String {
        quote::quote_identifier(value, self)
    }

    /// Identifier-quote a plain name.
    pub fn quote_name(&self, name: &str) -> String {
        quote::quote_identifier_str(name, self)
    }

    pub(crate) fn truncate_for_log<'a>(&self, sql: &'a str) -> &'a str {
        match self.max_logged_sql {
            Some(max) if sql.len() > max => {
                let mut end = max;
                while end > 0 && !sql.is_char_boundary(end) {
                    end -= 1;
                }
                &sql[..end]
            }
            _ => sql,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslash_escaping() {
        let d = Dialect::standard();
        assert_eq!(d.escape("it's"), "it\\'s");
        assert_eq!(d.escape("a\\b"), "a\\\\b");
        assert_eq!(d.escape("line\nbreak"), "line\\nbreak");
        assert_eq!(d.escape("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn doubling_escaping() {
        let d = Dialect::postgres();
        assert_eq!(d.escape("it's"), "it''s");
        assert_eq!(d.escape("a\\b"), "a\\b");
    }

    #[test]
    fn deserialize_with_defaults() {
        let d: Dialect =
            serde_json::from_str(r#"{"identifier_quote": "\"", "escape": "double"}"#).unwrap();
        assert_eq!(d.identifier_quote, '"');
        assert_eq!(d.escape, EscapeStyle::Double);
        assert_eq!(d.value_quote, '\'');
        assert_eq!(d.statement_separator, ';');
    }

    #[test]
    fn truncates_on_char_boundary() {
        let d = Dialect::standard().with_max_logged_sql(Some(2));
        assert_eq!(d.truncate_for_log("héllo"), "h");
        assert_eq!(d.with_max_logged_sql(None).truncate_for_log("héllo"), "héllo");
    }
}
