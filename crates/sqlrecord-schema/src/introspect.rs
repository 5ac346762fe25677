//! Database introspection.
//!
//! The introspector knows, per dialect, which statement lists the tables of
//! the current schema and which statement describes the columns of a table,
//! and how to turn the rows those statements return into [`Column`]s. It does
//! not execute anything itself; the adapter runs the statements so they are
//! logged and diagnosed like every other query.

use sqlrecord_core::{Column, ColumnType, Columns, DateTime, Dialect, Inflector, ParsedSqlType, Row, Value};

/// A statement plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrospectionQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl IntrospectionQuery {
    fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Facts read from one introspection row, before type mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    /// Declared type, e.g. `varchar(25)` or `numeric(10,2)`
    pub declared_type: String,
    pub nullable: bool,
    pub pk: bool,
    /// Default as the engine reports it (possibly quoted or cast)
    pub default: Option<String>,
    pub auto_increment: bool,
}

/// Dialect-specific schema introspection.
#[derive(Debug, Clone, Copy)]
pub struct Introspector {
    dialect: Dialect,
}

impl Introspector {
    /// Create a new introspector for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Statement returning one row, with a single column, per table.
    pub fn tables_query(&self) -> IntrospectionQuery {
        let sql = match self.dialect {
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
            Dialect::Mysql => "SHOW TABLES",
            Dialect::Pgsql => {
                "SELECT tablename FROM pg_tables WHERE schemaname NOT IN('information_schema','pg_catalog')"
            }
            Dialect::Oci => "SELECT table_name FROM user_tables",
        };
        IntrospectionQuery::new(sql, Vec::new())
    }

    /// Statement describing the columns of `table`, one row per column.
    pub fn columns_query(&self, table: &str) -> IntrospectionQuery {
        match self.dialect {
            Dialect::Sqlite => IntrospectionQuery::new(
                format!("PRAGMA table_info({})", self.dialect.quote_identifier(table)),
                Vec::new(),
            ),
            Dialect::Mysql => IntrospectionQuery::new(
                format!("SHOW COLUMNS FROM {}", self.dialect.quote_identifier(table)),
                Vec::new(),
            ),
            Dialect::Pgsql => IntrospectionQuery::new(
                "SELECT a.attname AS field, \
                 pg_catalog.format_type(a.atttypid, a.atttypmod) AS type, \
                 a.attnotnull AS not_nullable, \
                 EXISTS(SELECT 1 FROM pg_index i WHERE i.indrelid = c.oid \
                   AND a.attnum = ANY(i.indkey) AND i.indisprimary) AS pk, \
                 pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS \"default\" \
                 FROM pg_attribute a \
                 INNER JOIN pg_class c ON(a.attrelid = c.oid) \
                 LEFT JOIN pg_attrdef d ON(d.adrelid = c.oid AND d.adnum = a.attnum) \
                 WHERE c.relname = ? AND a.attnum > 0 AND NOT a.attisdropped \
                 ORDER BY a.attnum",
                vec![Value::Text(table.to_string())],
            ),
            Dialect::Oci => IntrospectionQuery::new(
                "SELECT c.column_name, c.data_type, c.data_length, c.data_precision, \
                 c.data_scale, c.data_default, c.nullable, \
                 (SELECT a.constraint_type FROM all_constraints a, all_cons_columns b \
                   WHERE a.constraint_type = 'P' AND a.constraint_name = b.constraint_name \
                   AND a.table_name = t.table_name AND b.column_name = c.column_name \
                   AND a.owner = b.owner AND ROWNUM = 1) AS pk \
                 FROM user_tables t INNER JOIN user_tab_columns c ON(t.table_name = c.table_name) \
                 WHERE t.table_name = ? ORDER BY c.column_id",
                vec![Value::Text(table.to_uppercase())],
            ),
        }
    }

    /// Table name carried by one row of [`tables_query`](Self::tables_query).
    pub fn table_name(&self, row: &Row) -> Option<String> {
        let name = text(row.get(0)?)?;
        Some(match self.dialect {
            Dialect::Oci => name.to_lowercase(),
            _ => name,
        })
    }

    /// Read the column facts out of one row of [`columns_query`](Self::columns_query).
    pub fn describe(&self, row: &Row) -> Option<ColumnDescription> {
        match self.dialect {
            Dialect::Sqlite => {
                let name = text(row.get_by_name("name")?)?;
                let declared_type = row.get_by_name("type").and_then(text).unwrap_or_default();
                let pk = row.get_by_name("pk").and_then(Value::as_i64).unwrap_or(0) > 0;
                let nullable = row.get_by_name("notnull").and_then(Value::as_i64).unwrap_or(0) == 0;
                // INTEGER PRIMARY KEY aliases the rowid
                let auto_increment =
                    pk && declared_type.trim().eq_ignore_ascii_case("integer");
                Some(ColumnDescription {
                    name,
                    declared_type,
                    nullable,
                    pk,
                    default: row.get_by_name("dflt_value").and_then(text),
                    auto_increment,
                })
            }
            Dialect::Mysql => {
                let name = text(row.get_by_name("Field")?)?;
                let extra = row.get_by_name("Extra").and_then(text).unwrap_or_default();
                Some(ColumnDescription {
                    name,
                    declared_type: row.get_by_name("Type").and_then(text).unwrap_or_default(),
                    nullable: row.get_by_name("Null").and_then(text).as_deref() == Some("YES"),
                    pk: row.get_by_name("Key").and_then(text).as_deref() == Some("PRI"),
                    default: row.get_by_name("Default").and_then(text),
                    auto_increment: extra.contains("auto_increment"),
                })
            }
            Dialect::Pgsql => {
                let name = text(row.get_by_name("field")?)?;
                let default = row.get_by_name("default").and_then(text);
                Some(ColumnDescription {
                    name,
                    declared_type: row.get_by_name("type").and_then(text).unwrap_or_default(),
                    nullable: !row.get_by_name("not_nullable").is_some_and(flag),
                    pk: row.get_by_name("pk").is_some_and(flag),
                    auto_increment: default
                        .as_deref()
                        .is_some_and(|d| d.starts_with("nextval(")),
                    default,
                })
            }
            Dialect::Oci => {
                let name = text(row.get_ignore_case("column_name")?)?.to_lowercase();
                let data_type = row
                    .get_ignore_case("data_type")
                    .and_then(text)
                    .unwrap_or_default()
                    .to_lowercase();
                let number = |column: &str| row.get_ignore_case(column).and_then(Value::as_i64);
                let declared_type = build_oracle_type(
                    &data_type,
                    number("data_length"),
                    number("data_precision"),
                    number("data_scale"),
                );
                Some(ColumnDescription {
                    name,
                    declared_type,
                    nullable: row.get_ignore_case("nullable").and_then(text).as_deref() != Some("N"),
                    pk: row.get_ignore_case("pk").and_then(text).as_deref() == Some("P"),
                    default: row
                        .get_ignore_case("data_default")
                        .and_then(text)
                        .map(|d| d.trim().to_string()),
                    auto_increment: false,
                })
            }
        }
    }

    /// Map described column facts to a catalog [`Column`].
    ///
    /// Raw types without a canonical mapping fall back to STRING.
    pub fn build_column(&self, description: ColumnDescription, inflector: &dyn Inflector) -> Column {
        let parsed = ParsedSqlType::parse(&description.declared_type);
        let raw_type = self.dialect.normalize_raw_type(&parsed.base_type);
        let column_type = self
            .dialect
            .column_type(&raw_type, &parsed)
            .unwrap_or_else(|| {
                tracing::warn!(
                    dialect = %self.dialect,
                    column = %description.name,
                    raw_type = %raw_type,
                    "Unmapped column type, treating as STRING"
                );
                ColumnType::String
            });

        let mut column = Column::new(description.name, raw_type, column_type);
        column.inflected_name = inflector.variablize(&column.name);
        column.length = parsed.declared_length().or_else(|| column_type.default_length());
        column.nullable = description.nullable;
        column.pk = description.pk;
        column.auto_increment = description.auto_increment;

        if let Some(default) = description.default {
            match sequence_from_default(&default) {
                Some(sequence) => {
                    column.sequence = Some(sequence);
                    column.auto_increment = true;
                }
                None => {
                    column.default = unquote_default(&default)
                        .map(|d| column.cast(Value::Text(d), &|s: &str| DateTime::parse(s)));
                }
            }
        }
        column
    }

    /// Build the catalog of a table from the rows of its columns query.
    pub fn columns(&self, rows: &[Row], inflector: &dyn Inflector) -> Columns {
        Columns::new(
            rows.iter()
                .filter_map(|row| self.describe(row))
                .map(|description| self.build_column(description, inflector))
                .collect(),
        )
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        other => Some(other.to_string()),
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Text(s) => matches!(s.as_str(), "t" | "true" | "1" | "YES" | "yes"),
        _ => false,
    }
}

/// Rebuild an Oracle type declaration from `user_tab_columns` facts.
fn build_oracle_type(
    data_type: &str,
    length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
) -> String {
    match data_type {
        "number" => match (precision, scale) {
            (Some(p), Some(s)) => format!("number({p},{s})"),
            (Some(p), None) => format!("number({p})"),
            _ => "number".to_string(),
        },
        "varchar2" | "nvarchar2" | "char" | "nchar" | "raw" => match length {
            Some(len) => format!("{data_type}({len})"),
            None => data_type.to_string(),
        },
        other => other.to_string(),
    }
}

/// `nextval('authors_author_id_seq'::regclass)` -> `authors_author_id_seq`
fn sequence_from_default(default: &str) -> Option<String> {
    let inner = default.trim().strip_prefix("nextval(")?.strip_suffix(')')?;
    let inner = inner.split("::").next().unwrap_or(inner);
    Some(inner.trim().trim_matches('\'').to_string())
}

/// Strip casts and quotes from an engine-reported default.
fn unquote_default(default: &str) -> Option<String> {
    let mut value = default.trim();
    if value.eq_ignore_ascii_case("null") {
        return None;
    }
    if value.starts_with('\'') {
        // 'default_name'::character varying
        if let Some(end) = value.rfind("'::") {
            value = &value[..=end];
        }
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return Some(value[1..value.len() - 1].replace("''", "'"));
    }
    if let Some(start) = value.find("::") {
        value = &value[..start];
    }
    Some(value.trim_matches(|c| c == '(' || c == ')').to_string())
}
