//! Core types and traits for SQLRecord.
//!
//! This crate provides the foundations every other SQLRecord crate builds on:
//!
//! - `Value`, `Row` and the date/time values read from and bound to statements
//! - `Column`/`ColumnType`, the dialect-independent column catalog
//! - `Dialect`, which owns every SQL syntax difference between engines
//! - `Driver`/`Connector`, the traits engine drivers implement
//! - `Config`, `Logger` and the date-class capability
//! - `Inflector`, used to derive table, class and key names

pub mod column;
pub mod config;
pub mod datetime;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod inflector;
pub mod logger;
pub mod row;
pub mod url;
pub mod value;

pub use column::{Column, ColumnType, Columns, ParsedSqlType};
pub use config::{Config, DEFAULT_CONNECTION, DateClassDescriptor};
pub use datetime::{Date, DateClass, DateTime, Zone};
pub use dialect::Dialect;
pub use driver::{Connector, Cursor, Driver};
pub use error::{
    AssociationError, AssociationErrorKind, AttributeError, AttributeErrorKind, ConfigError,
    ConfigErrorKind, ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind,
    Result, TransactionError, TransactionErrorKind, TypeError,
};
pub use inflector::{EnglishInflector, Inflector};
pub use logger::{Logger, TracingLogger};
pub use row::{ColumnInfo, FromValue, Row};
pub use url::ConnectionInfo;
pub use value::{KeyValue, Value};
