//! Row representation for query results.
//!
//! Statements run through the simple-query protocol, so every value arrives
//! as text (or `NULL`). Typed access goes through [`FromStr`].

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A row from a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl Row {
    /// Create a row from column names and text values.
    ///
    /// Rows of one result usually share a single `columns` allocation.
    pub fn new(columns: impl Into<Arc<[String]>>, values: Vec<Option<String>>) -> Self {
        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Get a value by column index.
    pub fn get<T>(&self, index: usize) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let text = self
            .values
            .get(index)
            .ok_or_else(|| Error::Column(format!("index {index} out of bounds")))?
            .as_deref()
            .ok_or_else(|| Error::Column(format!("column {:?} is NULL", self.name_of(index))))?;

        text.parse::<T>().map_err(|e| {
            Error::Column(format!(
                "cannot convert column {:?} value {text:?}: {e}",
                self.name_of(index)
            ))
        })
    }

    /// Get a value by column name (case-insensitive).
    pub fn get_by_name<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let index = self
            .position(name)
            .ok_or_else(|| Error::Column(format!("column {name:?} not found")))?;
        self.get(index)
    }

    /// Try to get a value by column index, returning None if NULL, missing
    /// or unparsable.
    pub fn try_get<T: FromStr>(&self, index: usize) -> Option<T> {
        self.get_str(index)?.parse().ok()
    }

    /// Try to get a value by column name, returning None if NULL, missing
    /// or unparsable.
    pub fn try_get_by_name<T: FromStr>(&self, name: &str) -> Option<T> {
        self.try_get(self.position(name)?)
    }

    /// Raw text of a column, `None` for NULL or out of bounds.
    #[must_use]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.values.get(index)?.as_deref()
    }

    /// Check whether the column at `index` is NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(None))
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_deref))
    }

    /// Row as a JSON object of strings and nulls.
    ///
    /// A repeated column name keeps the last value.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        self.iter()
            .map(|(name, value)| {
                let value = value.map_or(Value::Null, |v| Value::String(v.to_string()));
                (name.to_string(), value)
            })
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    fn name_of(&self, index: usize) -> &str {
        self.columns.get(index).map_or("?", String::as_str)
    }
}

/// Outcome of one simple query: the rows of every statement in it and the
/// total number of rows the statements reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Returned rows, in order.
    pub rows: Vec<Row>,
    /// Sum of the row counts from each statement's command tag.
    pub rows_affected: u64,
}

impl QueryResult {
    /// Create a result.
    #[must_use]
    pub fn new(rows: Vec<Row>, rows_affected: u64) -> Self {
        Self {
            rows,
            rows_affected,
        }
    }

    /// First row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Take the rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Row {
        let columns: Vec<String> = vec!["id".into(), "Name".into(), "score".into()];
        Row::new(columns, vec![Some("7".into()), Some("ada".into()), None])
    }

    #[test]
    fn test_typed_access() {
        let row = sample();
        assert_eq!(row.get::<i64>(0).unwrap(), 7);
        assert_eq!(row.get_by_name::<String>("name").unwrap(), "ada");
        assert_eq!(row.try_get_by_name::<u8>("ID"), Some(7));
    }

    #[test]
    fn test_access_errors() {
        let row = sample();
        assert!(matches!(row.get::<i64>(9), Err(Error::Column(_))));
        assert!(row.get::<f64>(2).unwrap_err().to_string().contains("NULL"));
        assert!(row.get::<i64>(1).unwrap_err().to_string().contains("\"ada\""));
        assert!(row.get_by_name::<i64>("missing").is_err());
        assert_eq!(row.try_get::<i64>(1), None);
        assert_eq!(row.try_get::<f64>(2), None);
    }

    #[test]
    fn test_nulls_and_shape() {
        let row = sample();
        assert!(row.is_null(2));
        assert!(!row.is_null(0));
        assert!(!row.is_null(9));
        assert_eq!(row.len(), 3);
        assert_eq!(row.columns()[1], "Name");
    }

    #[test]
    fn test_to_json() {
        let json = sample().to_json();
        assert_eq!(json["id"], "7");
        assert_eq!(json["Name"], "ada");
        assert!(json["score"].is_null());
    }

    #[test]
    fn test_query_result_helpers() {
        let result = QueryResult::new(vec![sample()], 1);
        assert_eq!(result.first().unwrap().get_str(1), Some("ada"));
        assert_eq!(result.into_iter().count(), 1);
        assert!(QueryResult::default().first().is_none());
    }
}
