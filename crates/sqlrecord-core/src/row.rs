//! Database row representation.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column names shared across all rows in a result set.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    /// Column names in order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Case-insensitive lookup, for engines that upper-case dictionary columns.
    pub fn index_of_ignore_case(&self, name: &str) -> Option<usize> {
        self.index_of(name).or_else(|| {
            self.names
                .iter()
                .position(|candidate| candidate.eq_ignore_ascii_case(name))
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from a database query.
///
/// Rows provide both index-based and name-based access to column values.
/// Column metadata is shared via `Arc`.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    ///
    /// For multiple rows from the same result set, prefer `with_columns`
    /// to share the column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Get a value by column name, ignoring ASCII case.
    pub fn get_ignore_case(&self, name: &str) -> Option<&Value> {
        self.columns
            .index_of_ignore_case(name)
            .and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column index.
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!(
                    "index {} out of bounds (row has {} columns)",
                    index,
                    self.len()
                ),
                column: None,
            })
        })?;
        T::from_value(value)
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Consume the row into owned (column_name, value) pairs.
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.columns.names().iter().cloned().zip(self.values).collect()
    }
}

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl<T> FromValue for T
where
    T: TryFrom<Value, Error = Error>,
{
    fn from_value(value: &Value) -> Result<Self> {
        T::try_from(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_basic_access() {
        let row = Row::new(
            vec!["author_id".to_string(), "name".to_string()],
            vec![Value::Int(1), Value::Text("Tito".to_string())],
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get(2), None);
        assert_eq!(
            row.get_by_name("name"),
            Some(&Value::Text("Tito".to_string()))
        );
        assert_eq!(row.get_by_name("missing"), None);
    }

    #[test]
    fn test_row_typed_access_and_errors() {
        let row = Row::new(
            vec!["id".to_string(), "label".to_string()],
            vec![Value::Int(42), Value::Text("not a number".to_string())],
        );

        assert_eq!(row.get_as::<i64>(0).unwrap(), 42);
        assert_eq!(row.get_as::<String>(1).unwrap(), "not a number");
        assert!(row.get_as::<i64>(1).is_err());
        assert!(row.get_as::<i64>(99).is_err());
    }

    #[test]
    fn test_row_null_handling() {
        let row = Row::new(vec!["nullable".to_string()], vec![Value::Null]);
        assert_eq!(row.get_as::<Option<i64>>(0).unwrap(), None);
        assert!(row.get_as::<i64>(0).is_err());
    }

    #[test]
    fn test_ignore_case_lookup() {
        let row = Row::new(
            vec!["COLUMN_NAME".to_string()],
            vec![Value::Text("AUTHOR_ID".to_string())],
        );
        assert!(row.get_by_name("column_name").is_none());
        assert_eq!(
            row.get_ignore_case("column_name"),
            Some(&Value::Text("AUTHOR_ID".to_string()))
        );
    }

    #[test]
    fn test_shared_columns_and_pairs() {
        let columns = Arc::new(ColumnInfo::new(vec!["a".to_string(), "b".to_string()]));
        let row1 = Row::with_columns(Arc::clone(&columns), vec![Value::Int(1), Value::Int(2)]);
        let row2 = Row::with_columns(Arc::clone(&columns), vec![Value::Int(3), Value::Int(4)]);
        assert!(Arc::ptr_eq(&row1.column_info(), &row2.column_info()));

        let pairs: Vec<_> = row1.iter().collect();
        assert_eq!(pairs, vec![("a", &Value::Int(1)), ("b", &Value::Int(2))]);
        assert_eq!(
            row2.into_pairs(),
            vec![("a".to_string(), Value::Int(3)), ("b".to_string(), Value::Int(4))]
        );
    }
}
