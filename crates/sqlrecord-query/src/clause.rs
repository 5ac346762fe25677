//! WHERE-clause fragments.
//!
//! A [`Conditions`] value is a SQL fragment with positional `?` placeholders
//! plus the values bound to them, in placeholder order.

use sqlrecord_core::{Dialect, Value};

/// A WHERE fragment and its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    sql: String,
    params: Vec<Value>,
}

impl Conditions {
    /// A raw fragment such as `"amount > ? AND status = ?"`.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// `column = ?`, or `column IS NULL` when `value` is NULL.
    pub fn eq(column: &str, value: Value) -> Self {
        if value.is_null() {
            Self::new(format!("{column} IS NULL"), Vec::new())
        } else {
            Self::new(format!("{column} = ?"), vec![value])
        }
    }

    /// `column IN(?,?,...)`.
    ///
    /// An empty list matches nothing (`1=0`) rather than producing `IN()`.
    pub fn in_list(column: &str, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return Self::new("1=0", Vec::new());
        }
        let placeholders = vec!["?"; values.len()].join(",");
        Self::new(format!("{column} IN({placeholders})"), values)
    }

    /// `table.col1 = ? AND table.col2 = ?` for paired columns and values.
    ///
    /// Columns are qualified with `table` when given. Extra values beyond the
    /// column list are ignored.
    pub fn from_keys(dialect: Dialect, table: Option<&str>, columns: &[String], values: &[Value]) -> Self {
        columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                let column = match table {
                    Some(table) => dialect.quote_qualified(table, column),
                    None => dialect.quote_identifier(column),
                };
                Self::eq(&column, value.clone())
            })
            .fold(Self::default(), Self::and)
    }

    /// Combine with another fragment using AND.
    ///
    /// Each non-empty side is parenthesized so OR inside a fragment keeps its
    /// meaning; an empty side leaves the other untouched.
    #[must_use]
    pub fn and(self, other: Conditions) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (_, true) => self,
            (true, false) => other,
            (false, false) => {
                let mut params = self.params;
                params.extend(other.params);
                Self {
                    sql: format!("({}) AND ({})", self.sql, other.sql),
                    params,
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

impl From<&str> for Conditions {
    fn from(sql: &str) -> Self {
        Self::new(sql, Vec::new())
    }
}

impl From<String> for Conditions {
    fn from(sql: String) -> Self {
        Self::new(sql, Vec::new())
    }
}
