//! SQLite driver for SQLRecord.
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! [`SqliteConnection`] implements the `Driver` trait from sqlrecord-core on
//! top of libsqlite3, and [`SqliteConnector`] plugs it into the connection
//! registry for `sqlite://` connection strings.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlrecord_connection::ConnectionRegistry;
//! use sqlrecord_core::Config;
//! use sqlrecord_sqlite::SqliteConnector;
//! use std::sync::Arc;
//!
//! let mut config = Config::new();
//! config.add_connection("development", "sqlite://:memory:");
//! let registry = ConnectionRegistry::new(config).with_connector(Arc::new(SqliteConnector::new()));
//! let adapter = registry.resolve(None)?;
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite Type |
//! |-------|-------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int` | INTEGER |
//! | `Double` | REAL |
//! | `Text`, `Decimal` | TEXT |
//! | `Bytes` | BLOB |
//! | `Date`, `DateTime` | TEXT |
//! | `Null` | NULL |

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection, SqliteConnector};

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
