//! Dynamic values substituted into statement templates.

use std::collections::BTreeMap;

/// A value stored in a [`Context`](crate::Context) or returned in a result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL `NULL`; also what a missing context path resolves to.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A sequence; quoted as a tuple, or a tuple list when nested.
    List(Vec<Value>),
    /// A nested mapping; context subtrees are stored this way.
    Map(BTreeMap<String, Value>),
    /// Already rendered SQL (e.g. a parenthesized sub-select), inserted verbatim.
    Sql(String),
}

impl Value {
    /// Pre-rendered SQL inserted without quoting.
    pub fn sql(text: impl Into<String>) -> Self {
        Self::Sql(text.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Sql(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Plain text form used for raw (`{?path}`) substitution and result re-keying.
    ///
    /// `Null` renders as the empty string; lists are joined with `,`.
    pub fn to_raw_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) | Self::Sql(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Value::to_raw_string)
                .collect::<Vec<_>>()
                .join(","),
            Self::Map(_) => serde_json::Value::from(self.clone()).to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(v: &[T]) -> Self {
        Self::List(v.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<chrono::NaiveDate> for Value {
    fn from(v: chrono::NaiveDate) -> Self {
        Self::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }
}

impl<Tz: chrono::TimeZone> From<chrono::DateTime<Tz>> for Value
where
    Tz::Offset: std::fmt::Display,
{
    fn from(v: chrono::DateTime<Tz>) -> Self {
        Self::Text(v.to_rfc3339())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::from(n),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) | Value::Sql(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::Int(3));
    }

    #[test]
    fn json_roundtrip_keeps_shape() {
        let json = serde_json::json!({"a": [1, 2.5, "x"], "b": null});
        let value = Value::from(json.clone());
        assert_eq!(
            value.as_map().unwrap()["a"],
            Value::List(vec![Value::Int(1), Value::Float(2.5), Value::from("x")])
        );
        assert_eq!(serde_json::Value::from(value), json);
    }

    #[test]
    fn raw_string_forms() {
        assert_eq!(Value::Null.to_raw_string(), "");
        assert_eq!(Value::from(vec![1i64, 2]).to_raw_string(), "1,2");
        assert_eq!(Value::sql("(SELECT 1)").to_raw_string(), "(SELECT 1)");
    }

    #[test]
    fn uuid_and_dates_become_text() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            Value::from(id),
            Value::from("00000000-0000-0000-0000-000000000000")
        );
        let d = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::from(d), Value::from("2024-02-29"));
    }
}
