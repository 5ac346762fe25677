//! SQL dialects and the syntax differences between them.
//!
//! Everything the rest of the mapper needs to know about an engine's SQL
//! (quoting, pagination, literal formats, sequences, type names) is answered
//! here so the relationship engine can stay dialect-agnostic.

use crate::column::{ColumnType, ParsedSqlType};
use crate::datetime::{Date, DateTime};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// SQLite (file or in-memory)
    Sqlite,
    /// MySQL / MariaDB
    Mysql,
    /// PostgreSQL
    Pgsql,
    /// Oracle (OCI)
    Oci,
}

impl Dialect {
    /// All dialects, in registration order.
    pub const ALL: [Dialect; 4] = [Dialect::Sqlite, Dialect::Mysql, Dialect::Pgsql, Dialect::Oci];

    /// Resolve a connection-string scheme.
    pub fn from_protocol(protocol: &str) -> Option<Self> {
        match protocol.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            "mysql" => Some(Dialect::Mysql),
            "pgsql" | "postgres" | "postgresql" => Some(Dialect::Pgsql),
            "oci" | "oracle" => Some(Dialect::Oci),
            _ => None,
        }
    }

    /// Canonical scheme name.
    pub const fn protocol(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Pgsql => "pgsql",
            Dialect::Oci => "oci",
        }
    }

    /// Default TCP port; SQLite has none.
    pub const fn default_port(self) -> u16 {
        match self {
            Dialect::Sqlite => 0,
            Dialect::Mysql => 3306,
            Dialect::Pgsql => 5432,
            Dialect::Oci => 1521,
        }
    }

    pub const fn quote_character(self) -> char {
        match self {
            Dialect::Mysql => '`',
            Dialect::Sqlite | Dialect::Pgsql | Dialect::Oci => '"',
        }
    }

    /// Whether auto-increment values come from explicit sequences.
    pub const fn supports_sequences(self) -> bool {
        matches!(self, Dialect::Pgsql | Dialect::Oci)
    }

    /// Wrap `name` in the quote character.
    ///
    /// A name that already starts or ends with the quote character is returned
    /// untouched, which makes quoting idempotent.
    pub fn quote_identifier(self, name: &str) -> String {
        let q = self.quote_character();
        if name.starts_with(q) || name.ends_with(q) {
            name.to_string()
        } else {
            format!("{q}{name}{q}")
        }
    }

    /// `table.column` with both parts quoted.
    pub fn quote_qualified(self, table: &str, column: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Render `value` as a string literal the engine accepts verbatim.
    pub fn escape_literal(self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        match self {
            Dialect::Mysql => {
                for c in value.chars() {
                    match c {
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\x1a' => out.push_str("\\Z"),
                        other => out.push(other),
                    }
                }
            }
            Dialect::Sqlite | Dialect::Pgsql | Dialect::Oci => {
                out.push_str(&value.replace('\'', "''"));
            }
        }
        out.push('\'');
        out
    }

    /// Restrict `sql` to at most `limit` rows starting at `offset`.
    ///
    /// A missing offset produces a limit-only clause. A missing limit is
    /// treated as zero, so paginating with neither returns no rows.
    pub fn paginate(self, sql: &str, offset: Option<u64>, limit: Option<u64>) -> String {
        let limit = limit.unwrap_or(0);
        match self {
            Dialect::Sqlite | Dialect::Mysql => match offset {
                Some(offset) => format!("{sql} LIMIT {offset},{limit}"),
                None => format!("{sql} LIMIT {limit}"),
            },
            Dialect::Pgsql => match offset {
                Some(offset) => format!("{sql} LIMIT {limit} OFFSET {offset}"),
                None => format!("{sql} LIMIT {limit}"),
            },
            Dialect::Oci => match offset {
                Some(offset) => {
                    let stop = offset.saturating_add(limit);
                    format!(
                        "SELECT * FROM (SELECT a.*, rownum ar_rnum__ FROM ({sql}) a WHERE rownum <= {stop}) WHERE ar_rnum__ > {offset}"
                    )
                }
                None => format!("SELECT * FROM ({sql}) WHERE rownum <= {limit}"),
            },
        }
    }

    /// Pattern used for timestamp literals.
    pub const fn datetime_format(self) -> &'static str {
        match self {
            Dialect::Oci => "d-M-Y h:i:s A",
            Dialect::Sqlite | Dialect::Mysql | Dialect::Pgsql => "Y-m-d H:i:s T",
        }
    }

    /// Pattern used for date literals.
    pub const fn date_format(self) -> &'static str {
        match self {
            Dialect::Oci => "d-M-Y",
            Dialect::Sqlite | Dialect::Mysql | Dialect::Pgsql => "Y-m-d",
        }
    }

    pub fn datetime_to_string(self, value: &DateTime) -> String {
        value.format(self.datetime_format())
    }

    pub fn date_to_string(self, value: &Date) -> String {
        value.format(self.date_format())
    }

    /// Name of the sequence feeding `column` of `table`.
    pub fn sequence_name_for(self, table: &str, column: &str) -> Result<String> {
        match self {
            Dialect::Pgsql => Ok(format!("{table}_{column}_seq")),
            Dialect::Oci => Ok(format!("{table}_seq")),
            Dialect::Sqlite | Dialect::Mysql => Err(Error::Unsupported(format!(
                "{} does not use sequences",
                self.protocol()
            ))),
        }
    }

    /// Statement returning the next value of `sequence`.
    pub fn next_sequence_value_sql(self, sequence: &str) -> Option<String> {
        match self {
            Dialect::Pgsql => Some(format!("SELECT nextval('{sequence}')")),
            Dialect::Oci => Some(format!("SELECT {sequence}.nextval FROM dual")),
            Dialect::Sqlite | Dialect::Mysql => None,
        }
    }

    /// Statement returning the value `sequence` handed out last in this session.
    pub fn current_sequence_value_sql(self, sequence: &str) -> Option<String> {
        match self {
            Dialect::Pgsql => Some(format!("SELECT currval('{sequence}')")),
            Dialect::Oci => Some(format!("SELECT {sequence}.currval FROM dual")),
            Dialect::Sqlite | Dialect::Mysql => None,
        }
    }

    /// Driver DSN parameters carrying `charset`, for dialects that take the
    /// encoding at connect time rather than through a command.
    pub fn dsn_params(self, charset: &str) -> Option<String> {
        match self {
            Dialect::Oci => Some(format!(";charset={charset}")),
            Dialect::Sqlite | Dialect::Mysql | Dialect::Pgsql => None,
        }
    }

    /// Command that switches the client encoding, if the dialect issues one.
    pub const fn set_encoding_sql(self) -> Option<&'static str> {
        match self {
            Dialect::Mysql | Dialect::Pgsql => Some("SET NAMES ?"),
            Dialect::Sqlite | Dialect::Oci => None,
        }
    }

    /// Normalize an engine type name to the name reported as `raw_type`.
    pub fn normalize_raw_type(self, base: &str) -> String {
        let base = base.trim().to_ascii_lowercase();
        let normalized = match (self, base.as_str()) {
            (_, "integer") => "int",
            (Dialect::Pgsql, "int4") => "int",
            (Dialect::Pgsql, "character varying") => "varchar",
            (Dialect::Pgsql, "character") => "char",
            (
                Dialect::Pgsql,
                "timestamp" | "timestamp without time zone" | "timestamp with time zone"
                | "timestamptz",
            ) => "datetime",
            (Dialect::Pgsql, "time without time zone" | "time with time zone" | "timetz") => {
                "time"
            }
            _ => return base,
        };
        normalized.to_string()
    }

    /// Map a (normalized) raw type to the canonical enum; `None` when unmapped.
    pub fn column_type(self, raw_type: &str, parsed: &ParsedSqlType) -> Option<ColumnType> {
        if let Some(common) = ColumnType::from_common_raw(raw_type) {
            return Some(common);
        }
        let mapped = match (self, raw_type) {
            (_, "varchar" | "char" | "text" | "clob" | "blob") => ColumnType::String,
            (
                Dialect::Mysql,
                "tinytext" | "mediumtext" | "longtext" | "enum" | "set" | "binary" | "varbinary"
                | "tinyblob" | "mediumblob" | "longblob" | "json",
            ) => ColumnType::String,
            (Dialect::Mysql, "year") => ColumnType::Integer,
            (Dialect::Sqlite, "boolean" | "bool") => ColumnType::Integer,
            (Dialect::Sqlite, "nvarchar" | "nchar" | "varying character") => ColumnType::String,
            (
                Dialect::Pgsql,
                "int2" | "int8" | "serial" | "bigserial" | "smallserial" | "serial4" | "serial8",
            ) => ColumnType::Integer,
            (Dialect::Pgsql, "float4" | "float8" | "double precision" | "money") => {
                ColumnType::Decimal
            }
            (
                Dialect::Pgsql,
                "bpchar" | "uuid" | "json" | "jsonb" | "bool" | "boolean" | "bytea" | "inet",
            ) => ColumnType::String,
            (Dialect::Oci, "number") => {
                if parsed.scale.unwrap_or(0) > 0 {
                    ColumnType::Decimal
                } else {
                    ColumnType::Integer
                }
            }
            (Dialect::Oci, "binary_float" | "binary_double") => ColumnType::Decimal,
            (
                Dialect::Oci,
                "varchar2" | "nvarchar2" | "nchar" | "nclob" | "raw" | "long" | "rowid",
            ) => ColumnType::String,
            _ => return None,
        };
        Some(mapped)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.protocol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_does_not_over_quote() {
        for dialect in Dialect::ALL {
            let q = dialect.quote_character();
            assert_eq!(dialect.quote_identifier(&format!("{q}string")), format!("{q}string"));
            assert_eq!(dialect.quote_identifier(&format!("string{q}")), format!("string{q}"));
            let once = dialect.quote_identifier("string");
            assert_eq!(once, format!("{q}string{q}"));
            assert_eq!(dialect.quote_identifier(&once), once);
        }
    }

    #[test]
    fn test_quote_character_per_dialect() {
        assert_eq!(Dialect::Mysql.quote_identifier("authors"), "`authors`");
        assert_eq!(Dialect::Pgsql.quote_identifier("authors"), "\"authors\"");
        assert_eq!(
            Dialect::Sqlite.quote_qualified("people", "id"),
            "\"people\".\"id\""
        );
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(Dialect::Sqlite.escape_literal("Bob's"), "'Bob''s'");
        assert_eq!(Dialect::Mysql.escape_literal("Bob's"), "'Bob\\'s'");
        assert_ne!(Dialect::Oci.escape_literal("Bob's"), "Bob's");
    }

    #[test]
    fn test_paginate_limit_offset_dialects() {
        let sql = "SELECT * FROM authors ORDER BY name ASC";
        assert_eq!(
            Dialect::Mysql.paginate(sql, Some(1), Some(2)),
            format!("{sql} LIMIT 1,2")
        );
        assert_eq!(Dialect::Mysql.paginate(sql, None, Some(1)), format!("{sql} LIMIT 1"));
        assert_eq!(
            Dialect::Pgsql.paginate(sql, Some(2), Some(1)),
            format!("{sql} LIMIT 1 OFFSET 2")
        );
        assert_eq!(Dialect::Pgsql.paginate(sql, None, Some(1)), format!("{sql} LIMIT 1"));
    }

    #[test]
    fn test_paginate_both_null_limits_to_zero_rows() {
        let sql = "SELECT * FROM authors";
        assert_eq!(Dialect::Sqlite.paginate(sql, None, None), format!("{sql} LIMIT 0"));
        assert_eq!(Dialect::Pgsql.paginate(sql, None, None), format!("{sql} LIMIT 0"));
        assert!(Dialect::Oci.paginate(sql, None, None).ends_with("rownum <= 0"));
    }

    #[test]
    fn test_oracle_rownum_window() {
        let sql = Dialect::Oci.paginate("SELECT * FROM authors", Some(1), Some(2));
        assert!(sql.contains("rownum <= 3"));
        assert!(sql.ends_with("ar_rnum__ > 1"));

        let far = Dialect::Oci.paginate("SELECT * FROM authors", Some(u64::MAX), Some(10));
        assert!(far.contains(&format!("rownum <= {}", u64::MAX)));
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            Dialect::Pgsql.sequence_name_for("authors", "author_id").unwrap(),
            "authors_author_id_seq"
        );
        assert_eq!(
            Dialect::Oci.sequence_name_for("authors", "author_id").unwrap(),
            "authors_seq"
        );
        assert!(Dialect::Mysql.sequence_name_for("authors", "author_id").is_err());
        assert!(Dialect::Sqlite.next_sequence_value_sql("s").is_none());
        assert_eq!(
            Dialect::Oci.next_sequence_value_sql("authors_seq").as_deref(),
            Some("SELECT authors_seq.nextval FROM dual")
        );
    }

    #[test]
    fn test_date_literals() {
        let dt = DateTime::parse("2009-01-01 01:01:01 EST").unwrap();
        assert_eq!(Dialect::Mysql.datetime_to_string(&dt), "2009-01-01 01:01:01 EST");
        assert_eq!(Dialect::Sqlite.date_to_string(&dt.date()), "2009-01-01");
        assert_eq!(Dialect::Oci.datetime_to_string(&dt), "01-Jan-2009 01:01:01 AM");
        assert_eq!(Dialect::Oci.date_to_string(&dt.date()), "01-Jan-2009");
    }

    #[test]
    fn test_type_mapping() {
        let plain = ParsedSqlType::default();
        assert_eq!(Dialect::Mysql.column_type("enum", &plain), Some(ColumnType::String));
        assert_eq!(Dialect::Sqlite.column_type("int", &plain), Some(ColumnType::Integer));
        assert_eq!(Dialect::Pgsql.column_type("int8", &plain), Some(ColumnType::Integer));
        assert_eq!(Dialect::Mysql.column_type("geometry", &plain), None);

        let number = ParsedSqlType::parse("number(10,2)");
        assert_eq!(Dialect::Oci.column_type("number", &number), Some(ColumnType::Decimal));
        let whole = ParsedSqlType::parse("number(10)");
        assert_eq!(Dialect::Oci.column_type("number", &whole), Some(ColumnType::Integer));
    }

    #[test]
    fn test_raw_type_normalization() {
        assert_eq!(Dialect::Sqlite.normalize_raw_type("INTEGER"), "int");
        assert_eq!(Dialect::Pgsql.normalize_raw_type("character varying"), "varchar");
        assert_eq!(
            Dialect::Pgsql.normalize_raw_type("timestamp without time zone"),
            "datetime"
        );
        assert_eq!(Dialect::Oci.normalize_raw_type("VARCHAR2"), "varchar2");
    }

    #[test]
    fn test_protocols_and_ports() {
        assert_eq!(Dialect::from_protocol("postgres"), Some(Dialect::Pgsql));
        assert_eq!(Dialect::from_protocol("terribledb"), None);
        for dialect in Dialect::ALL {
            if dialect != Dialect::Sqlite {
                assert!(dialect.default_port() > 0);
            }
            assert_eq!(Dialect::from_protocol(dialect.protocol()), Some(dialect));
        }
    }
}
