//! Column/type catalog: per-table column metadata and canonical types.

use crate::datetime::DateTime;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dialect-independent column type every raw engine type maps into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
    Date,
    DateTime,
    Time,
}

impl ColumnType {
    /// Mapping shared by every dialect; dialects layer their own names on top.
    pub fn from_common_raw(raw: &str) -> Option<Self> {
        Some(match raw {
            "datetime" | "timestamp" => ColumnType::DateTime,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "tinyint" | "smallint" | "mediumint" | "int" | "bigint" => ColumnType::Integer,
            "float" | "double" | "numeric" | "decimal" | "dec" | "real" => ColumnType::Decimal,
            _ => return None,
        })
    }

    /// Length reported when the engine declares none.
    pub const fn default_length(self) -> Option<u32> {
        match self {
            ColumnType::String => None,
            ColumnType::Integer => Some(11),
            ColumnType::Decimal => Some(10),
            ColumnType::Date => Some(10),
            ColumnType::DateTime => Some(19),
            ColumnType::Time => Some(8),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Integer => "INTEGER",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Time => "TIME",
        }
    }
}

/// Parsed representation of a raw SQL type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSqlType {
    /// Lower-cased base type name (`varchar`, `decimal`, `enum`)
    pub base_type: String,
    /// Length for character types (`varchar(255)` -> 255)
    pub length: Option<u32>,
    /// Precision for numeric types (`decimal(10,2)` -> 10)
    pub precision: Option<u32>,
    /// Scale for numeric types (`decimal(10,2)` -> 2)
    pub scale: Option<u32>,
    /// Whether the type is unsigned (MySQL)
    pub unsigned: bool,
}

impl ParsedSqlType {
    /// Parse a SQL type string into structured metadata.
    ///
    /// - `varchar(255)` -> base `varchar`, length 255
    /// - `DECIMAL(10,2)` -> base `decimal`, precision 10, scale 2
    /// - `int(11) unsigned` -> base `int`, length 11, unsigned
    /// - `enum('a','b')` -> base `enum`, no length
    pub fn parse(type_str: &str) -> Self {
        let lowered = type_str.trim().to_ascii_lowercase();

        let (type_str, unsigned) = match lowered.strip_suffix(" unsigned") {
            Some(rest) => (rest.trim(), true),
            None => (lowered.as_str(), false),
        };

        let Some(paren_start) = type_str.find('(') else {
            return Self {
                base_type: type_str.to_string(),
                unsigned,
                ..Self::default()
            };
        };

        let base_type = type_str[..paren_start].trim().to_string();
        let params = type_str[paren_start + 1..]
            .split(')')
            .next()
            .unwrap_or_default();

        if params.contains(',') {
            let mut parts = params.split(',').map(|p| p.trim().parse::<u32>().ok());
            let precision = parts.next().flatten();
            let scale = parts.next().flatten();
            Self {
                base_type,
                length: None,
                precision,
                scale,
                unsigned,
            }
        } else {
            Self {
                base_type,
                length: params.trim().parse().ok(),
                precision: None,
                scale: None,
                unsigned,
            }
        }
    }

    /// Declared size: the length, or the precision for numeric types.
    pub fn declared_length(&self) -> Option<u32> {
        self.length.or(self.precision)
    }
}

/// Metadata for one physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Name as reported by the engine
    pub name: String,
    /// Normalized identifier used for attribute binding
    pub inflected_name: String,
    /// Dialect-native base type (`varchar`, `int`, `datetime`)
    pub raw_type: String,
    /// Canonical type
    pub column_type: ColumnType,
    /// Declared or implied size; `None` when not meaningful
    pub length: Option<u32>,
    pub nullable: bool,
    pub pk: bool,
    pub default: Option<Value>,
    pub auto_increment: bool,
    /// Engine-specific auto-increment source
    pub sequence: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, raw_type: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            inflected_name: name.clone(),
            name,
            raw_type: raw_type.into(),
            column_type,
            length: column_type.default_length(),
            nullable: true,
            pk: false,
            default: None,
            auto_increment: false,
            sequence: None,
        }
    }

    /// Convert a driver value to this column's canonical type.
    ///
    /// Conversion never fails: a value that cannot be converted is kept as-is.
    pub fn cast(&self, value: Value, parse_datetime: &dyn Fn(&str) -> Option<DateTime>) -> Value {
        match (self.column_type, value) {
            (_, Value::Null) => Value::Null,
            (ColumnType::Integer, Value::Text(s)) => match s.trim().parse::<i64>() {
                Ok(v) => Value::Int(v),
                Err(_) => match s.trim().parse::<f64>() {
                    Ok(f) if f.is_finite() => Value::Int(f.trunc() as i64),
                    _ => Value::Text(s),
                },
            },
            (ColumnType::Integer, Value::Double(f)) if f.is_finite() => Value::Int(f.trunc() as i64),
            (ColumnType::Integer, Value::Bool(b)) => Value::Int(i64::from(b)),
            (ColumnType::Decimal, Value::Text(s)) if s.trim().parse::<f64>().is_ok() => {
                Value::Decimal(s.trim().to_string())
            }
            (ColumnType::String, Value::Int(v)) => Value::Text(v.to_string()),
            (ColumnType::String, Value::Double(v)) => Value::Text(v.to_string()),
            (ColumnType::String, Value::Decimal(s)) => Value::Text(s),
            (ColumnType::Date, Value::Text(s)) => match parse_datetime(&s) {
                Some(dt) => Value::Date(dt.date()),
                None => Value::Text(s),
            },
            (ColumnType::Date, Value::DateTime(dt)) => Value::Date(dt.date()),
            (ColumnType::DateTime, Value::Text(s)) => match parse_datetime(&s) {
                Some(dt) => Value::DateTime(dt),
                None => Value::Text(s),
            },
            (ColumnType::DateTime, Value::Date(d)) => Value::DateTime(DateTime::from(d)),
            (ColumnType::Time, Value::DateTime(dt)) => Value::Text(dt.format("H:i:s")),
            (_, other) => other,
        }
    }
}

/// The column catalog of one table, in physical order.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
}

impl Columns {
    pub fn new(columns: Vec<Column>) -> Self {
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self { columns, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    /// Look a column up by its inflected name.
    pub fn get_inflected(&self, inflected: &str) -> Option<&Column> {
        self.get(inflected)
            .or_else(|| self.columns.iter().find(|c| c.inflected_name == inflected))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Inflected names of the primary-key columns, in physical order.
    pub fn primary_key(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.pk)
            .map(|c| c.inflected_name.clone())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
