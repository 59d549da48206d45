//! Value and identifier quoting.
//!
//! Pure functions: the same input and [`Dialect`] always produce the same text.
//!
//! - Values: booleans become `1`/`0` (or `TRUE`/`FALSE` when the dialect asks
//!   for keywords), numbers stay bare, text is escaped and
//!   wrapped in the value quote, sequences become `(a,b)` (or `(a,b),(c,d)`
//!   once any element is itself a sequence), `NULL` for null and `[]`.
//! - Identifiers: `a.b` becomes `` `a`.`b` ``; existing quotes are stripped
//!   before re-wrapping.

use crate::dialect::Dialect;
use crate::value::Value;

/// Quote a value for direct inclusion in SQL text.
pub fn quote_value(value: &Value, dialect: &Dialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => match (*b, dialect.bool_keywords) {
            (true, false) => "1",
            (false, false) => "0",
            (true, true) => "TRUE",
            (false, true) => "FALSE",
        }
        .to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Float(_) => "NULL".to_string(),
        Value::Sql(sql) => sql.clone(),
        Value::List(items) => quote_sequence(items, |v| quote_value(v, dialect)),
        Value::Text(s) => wrap_text(s, dialect),
        Value::Map(_) => wrap_text(&value.to_raw_string(), dialect),
    }
}

/// Quote an identifier (or a sequence of identifiers).
///
/// Anything that is neither text nor a sequence quotes to the empty string.
pub fn quote_identifier(value: &Value, dialect: &Dialect) -> String {
    match value {
        Value::Text(s) => quote_identifier_str(s, dialect),
        Value::List(items) => quote_sequence(items, |v| quote_identifier(v, dialect)),
        _ => String::new(),
    }
}

/// Quote a dotted identifier string segment by segment.
pub fn quote_identifier_str(name: &str, dialect: &Dialect) -> String {
    let q = dialect.identifier_quote;
    let sep = dialect.namespace_separator;
    let mut out = String::with_capacity(name.len() + 4);
    for (i, segment) in name.split(sep).enumerate() {
        if i > 0 {
            out.push(sep);
        }
        let segment = segment.trim_matches(q);
        if segment == "*" {
            out.push('*');
            continue;
        }
        out.push(q);
        for ch in segment.chars() {
            if ch == q {
                out.push(q);
            }
            out.push(ch);
        }
        out.push(q);
    }
    out
}

fn wrap_text(text: &str, dialect: &Dialect) -> String {
    let escaped = dialect.escape(text);
    let mut out = String::with_capacity(escaped.len() + 2);
    out.push(dialect.value_quote);
    out.push_str(&escaped);
    out.push(dialect.value_quote);
    out
}

fn quote_sequence(items: &[Value], quote: impl Fn(&Value) -> String) -> String {
    if items.is_empty() {
        return "NULL".to_string();
    }
    let nested = items.iter().any(Value::is_list);
    let body = items.iter().map(quote).collect::<Vec<_>>().join(",");
    if nested { body } else { format!("({body})") }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> Dialect {
        Dialect::standard()
    }

    #[test]
    fn scalars() {
        let d = dialect();
        assert_eq!(quote_value(&Value::Null, &d), "NULL");
        assert_eq!(quote_value(&true.into(), &d), "1");
        assert_eq!(quote_value(&false.into(), &d), "0");
        assert_eq!(quote_value(&42i64.into(), &d), "42");
        assert_eq!(quote_value(&(-1.5f64).into(), &d), "-1.5");
        assert_eq!(quote_value(&f64::NAN.into(), &d), "NULL");
        assert_eq!(quote_value(&"it's".into(), &d), "'it\\'s'");
        assert_eq!(quote_value(&true.into(), &Dialect::postgres()), "TRUE");
        assert_eq!(
            quote_value(&"it's".into(), &Dialect::postgres()),
            "'it''s'"
        );
    }

    #[test]
    fn sequences() {
        let d = dialect();
        assert_eq!(quote_value(&Value::List(vec![]), &d), "NULL");
        assert_eq!(quote_value(&vec![1i64, 2].into(), &d), "(1,2)");
        assert_eq!(
            quote_value(&vec![vec![1i64, 2], vec![3, 4]].into(), &d),
            "(1,2),(3,4)"
        );
        assert_eq!(quote_value(&vec!["a", "b"].into(), &d), "('a','b')");
        // one nested element is enough to drop the outer parens
        let mixed = Value::List(vec![Value::Int(1), Value::from(vec![2i64, 3])]);
        assert_eq!(quote_value(&mixed, &d), "1,(2,3)");
    }

    #[test]
    fn sql_is_verbatim() {
        let d = dialect();
        assert_eq!(
            quote_value(&Value::sql("(SELECT 1)"), &d),
            "(SELECT 1)"
        );
    }

    #[test]
    fn quoting_is_deterministic() {
        let d = dialect();
        let v = Value::from(vec!["x'y", "z"]);
        assert_eq!(quote_value(&v, &d), quote_value(&v, &d));
    }

    #[test]
    fn identifiers() {
        let d = dialect();
        assert_eq!(quote_identifier(&"a.b".into(), &d), "`a`.`b`");
        assert_eq!(quote_identifier(&"a.`b`".into(), &d), "`a`.`b`");
        assert_eq!(quote_identifier(&"users".into(), &d), "`users`");
        assert_eq!(quote_identifier(&"u.*".into(), &d), "`u`.*");
        assert_eq!(quote_identifier(&"a`b".into(), &d), "`a``b`");
        assert_eq!(
            quote_identifier(&"public.users".into(), &Dialect::postgres()),
            "\"public\".\"users\""
        );
    }

    #[test]
    fn identifier_sequences_and_non_strings() {
        let d = dialect();
        assert_eq!(quote_identifier(&vec!["a", "b"].into(), &d), "(`a`,`b`)");
        assert_eq!(
            quote_identifier(&vec![vec!["a"], vec!["b"]].into(), &d),
            "(`a`),(`b`)"
        );
        assert_eq!(quote_identifier(&Value::Int(1), &d), "");
        assert_eq!(quote_identifier(&Value::Null, &d), "");
    }
}
