//! Result cursor over the rows of one executed command.
//!
//! A [`ResultSet`] owns its rows. The cursor starts on the first row; the
//! one-row `fetch_*` methods return the loaded row and advance, the
//! `fetch_all_*` methods rewind first and leave the cursor exhausted.
//!
//! ```ignore
//! let mut users = conn.statement().from("users")?.search(None).await?.one()?;
//! while let Some(row) = users.fetch_assoc() {
//!     println!("{:?}", row["name"]);
//! }
//! ```

use crate::error::{WeaveError, WeaveResult};
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Rows returned by one command, plus its affected-row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    sql: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    affected: u64,
    last_insert_id: Option<i64>,
    position: usize,
}

impl ResultSet {
    /// Result of a row-returning command.
    ///
    /// Rows should carry one value per column; a short row has no value for
    /// its trailing columns and extra values are ignored.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let affected = rows.len() as u64;
        Self {
            columns,
            rows,
            affected,
            ..Self::default()
        }
    }

    /// Result of a command that returns no rows.
    pub fn affected(count: u64) -> Self {
        Self {
            affected: count,
            ..Self::default()
        }
    }

    /// Build from `(column, value)` records. Columns are taken from the first record.
    pub fn from_records<I, R, K>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for (i, record) in records.into_iter().enumerate() {
            let mut row = Vec::new();
            for (name, value) in record {
                if i == 0 {
                    columns.push(name.into());
                }
                row.push(value);
            }
            rows.push(row);
        }
        Self::new(columns, rows)
    }

    /// Record the statement text that produced this result.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    pub fn with_last_insert_id(mut self, id: Option<i64>) -> Self {
        self.last_insert_id = id;
        self
    }

    /// Statement text as sent to the driver.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Generated key reported by the driver, if it reports one.
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows affected (or returned) by the command.
    pub fn affected_rows(&self) -> u64 {
        self.affected
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    // ==================== Cursor ====================

    /// Move back to the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Load the next row.
    pub fn advance(&mut self) {
        if self.position < self.rows.len() {
            self.position += 1;
        }
    }

    /// The loaded row, if the cursor is on one.
    pub fn current(&self) -> Option<&[Value]> {
        self.rows.get(self.position).map(Vec::as_slice)
    }

    pub fn valid(&self) -> bool {
        self.position < self.rows.len()
    }

    /// Zero-based index of the loaded row.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Value of `column` in the loaded row.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.current().and_then(|row| row.get(index))
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn key_index(&self, field: &str) -> WeaveResult<usize> {
        self.column_index(field)
            .ok_or_else(|| WeaveError::not_found(format!("column '{field}' not in result")))
    }

    fn assoc(&self, row: &[Value]) -> BTreeMap<String, Value> {
        self.columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect()
    }

    fn decode<T: DeserializeOwned>(&self, row: &[Value]) -> WeaveResult<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .cloned()
            .zip(row.iter().cloned().map(serde_json::Value::from))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| WeaveError::decode(format!("row {}", self.position), e.to_string()))
    }

    /// Key every row by the raw text of `field`. Later rows win on equal keys;
    /// a row without that column is keyed by the empty string.
    fn keyed<T>(
        &mut self,
        field: &str,
        mut map: impl FnMut(&Self, &[Value]) -> WeaveResult<T>,
    ) -> WeaveResult<BTreeMap<String, T>> {
        let index = self.key_index(field)?;
        let mut out = BTreeMap::new();
        self.rewind();
        while let Some(row) = self.current() {
            let key = row.get(index).map(Value::to_raw_string).unwrap_or_default();
            let value = map(self, row)?;
            out.insert(key, value);
            self.advance();
        }
        Ok(out)
    }

    fn collect_all<T>(
        &mut self,
        mut map: impl FnMut(&Self, &[Value]) -> WeaveResult<T>,
    ) -> WeaveResult<Vec<T>> {
        let mut out = Vec::with_capacity(self.rows.len());
        self.rewind();
        while let Some(row) = self.current() {
            out.push(map(self, row)?);
            self.advance();
        }
        Ok(out)
    }

    // ==================== Positional ====================

    /// The loaded row as values in column order, then advance.
    pub fn fetch_row(&mut self) -> Option<Vec<Value>> {
        let row = self.current()?.to_vec();
        self.advance();
        Some(row)
    }

    pub fn fetch_all_rows(&mut self) -> Vec<Vec<Value>> {
        self.position = self.rows.len();
        self.rows.clone()
    }

    pub fn fetch_all_rows_by(&mut self, field: &str) -> WeaveResult<BTreeMap<String, Vec<Value>>> {
        self.keyed(field, |_, row| Ok(row.to_vec()))
    }

    // ==================== Associative ====================

    /// The loaded row as column → value, then advance.
    pub fn fetch_assoc(&mut self) -> Option<BTreeMap<String, Value>> {
        let row = self.assoc(self.current()?);
        self.advance();
        Some(row)
    }

    pub fn fetch_all_assoc(&mut self) -> Vec<BTreeMap<String, Value>> {
        let mut out = Vec::with_capacity(self.rows.len());
        self.rewind();
        while let Some(row) = self.fetch_assoc() {
            out.push(row);
        }
        out
    }

    pub fn fetch_all_assoc_by(
        &mut self,
        field: &str,
    ) -> WeaveResult<BTreeMap<String, BTreeMap<String, Value>>> {
        self.keyed(field, |rs, row| Ok(rs.assoc(row)))
    }

    // ==================== Objects ====================

    /// The loaded row deserialized into `T`, then advance.
    ///
    /// Column names map to field names. A decode failure does not advance.
    pub fn fetch_object<T: DeserializeOwned>(&mut self) -> WeaveResult<Option<T>> {
        let Some(row) = self.current() else {
            return Ok(None);
        };
        let object = self.decode(row)?;
        self.advance();
        Ok(Some(object))
    }

    pub fn fetch_all_objects<T: DeserializeOwned>(&mut self) -> WeaveResult<Vec<T>> {
        self.collect_all(|rs, row| rs.decode(row))
    }

    pub fn fetch_all_objects_by<T: DeserializeOwned>(
        &mut self,
        field: &str,
    ) -> WeaveResult<BTreeMap<String, T>> {
        self.keyed(field, |rs, row| rs.decode(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn users() -> ResultSet {
        ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int(1), Value::from("ann")],
                vec![Value::Int(2), Value::from("bob")],
            ],
        )
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    #[test]
    fn cursor_walks_forward() {
        let mut rs = users();
        assert!(rs.valid());
        assert_eq!(rs.get("name"), Some(&Value::from("ann")));
        rs.advance();
        assert_eq!(rs.current().unwrap()[0], Value::Int(2));
        rs.advance();
        assert!(!rs.valid());
        assert!(rs.current().is_none());
        rs.advance();
        assert_eq!(rs.position(), 2);
        rs.rewind();
        assert_eq!(rs.position(), 0);
        assert!(rs.valid());
    }

    #[test]
    fn positional_fetch() {
        let mut rs = users();
        assert_eq!(rs.fetch_row(), Some(vec![Value::Int(1), Value::from("ann")]));
        assert_eq!(rs.fetch_all_rows().len(), 2);
        assert!(rs.fetch_row().is_none());

        let by_name = rs.fetch_all_rows_by("name").unwrap();
        assert_eq!(by_name["bob"], vec![Value::Int(2), Value::from("bob")]);
    }

    #[test]
    fn assoc_fetch() {
        let mut rs = users();
        let first = rs.fetch_assoc().unwrap();
        assert_eq!(first["id"], Value::Int(1));
        let all = rs.fetch_all_assoc();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1]["name"], Value::from("bob"));

        let by_id = rs.fetch_all_assoc_by("id").unwrap();
        assert_eq!(by_id["2"]["name"], Value::from("bob"));
        assert!(rs.fetch_all_assoc_by("missing").is_err());
    }

    #[test]
    fn object_fetch() {
        let mut rs = users();
        let ann: User = rs.fetch_object().unwrap().unwrap();
        assert_eq!(ann, User { id: 1, name: "ann".into() });

        let all: Vec<User> = rs.fetch_all_objects().unwrap();
        assert_eq!(all.len(), 2);

        let by_name: BTreeMap<String, User> = rs.fetch_all_objects_by("name").unwrap();
        assert_eq!(by_name["bob"].id, 2);

        let mut empty = ResultSet::affected(3)
            .with_sql("DELETE FROM users")
            .with_last_insert_id(Some(7));
        assert_eq!(empty.affected_rows(), 3);
        assert_eq!(empty.sql(), "DELETE FROM users");
        assert_eq!(empty.last_insert_id(), Some(7));
        assert!(empty.fetch_object::<User>().unwrap().is_none());
    }

    #[test]
    fn decode_failure_keeps_position() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrong {
            id: String,
        }
        let mut rs = users();
        let err = rs.fetch_object::<Wrong>().unwrap_err();
        assert!(matches!(err, WeaveError::Decode { .. }));
        assert_eq!(rs.position(), 0);
    }

    #[test]
    fn short_rows_lack_trailing_columns() {
        let mut rs = ResultSet::new(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Int(1)], vec![Value::Int(2), Value::from("bob")]],
        );
        assert_eq!(rs.get("name"), None);

        let by_name = rs.fetch_all_rows_by("name").unwrap();
        assert_eq!(by_name[""], vec![Value::Int(1)]);
        assert_eq!(by_name["bob"].len(), 2);

        let by_name = rs.fetch_all_assoc_by("name").unwrap();
        assert!(!by_name[""].contains_key("name"));
        assert_eq!(rs.fetch_all_assoc()[0].len(), 1);
    }

    #[test]
    fn from_records_takes_first_columns() {
        let rs = ResultSet::from_records(vec![
            vec![("a", Value::Int(1)), ("b", Value::Int(2))],
            vec![("a", Value::Int(3)), ("b", Value::Int(4))],
        ]);
        assert_eq!(rs.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(rs.len(), 2);
    }
}
