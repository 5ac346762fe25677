//! SQLite connection implementation.
//!
//! [`SqliteConnection`] wraps one database handle and implements the
//! [`Driver`] trait; [`SqliteConnector`] opens connections for `sqlite://`
//! connection strings.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers

use crate::ffi;
use crate::types;
use sqlrecord_core::{
    ColumnInfo, ConnectionInfo, Connector, Dialect, Driver, Error, QueryErrorKind, Result, Row,
    Value,
};
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::Arc;

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = ffi::SQLITE_OPEN_FULLMUTEX;
        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        } else {
            flags |= ffi::SQLITE_OPEN_READWRITE;
            if self.create {
                flags |= ffi::SQLITE_OPEN_CREATE;
            }
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// A connection to a SQLite database.
pub struct SqliteConnection {
    db: *mut ffi::sqlite3,
    path: String,
}

// SAFETY: the handle is opened in serialized mode and only used through
// `&mut self`, so moving it to another thread is sound.
unsafe impl Send for SqliteConnection {}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str())
            .map_err(|_| Error::connection_failed("Invalid path: contains null byte"))?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: db is valid until closed below
                unsafe {
                    let msg = ffi::error_message(db);
                    ffi::sqlite3_close_v2(db);
                    msg
                }
            };
            tracing::warn!(path = %config.path, error = %msg, "Failed to open SQLite database");
            return Err(Error::connection_failed(format!(
                "Failed to open database '{}': {}",
                config.path, msg
            )));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::debug!(path = %config.path, version = ffi::version(), "Opened SQLite database");
        Ok(Self {
            db,
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run a script of `;`-separated statements without parameters.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql).map_err(|_| nul_error(sql))?;
        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if errmsg.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: errmsg is valid and must be released with sqlite3_free
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    msg
                }
            };
            return Err(Error::query_failed(error_code_to_kind(rc), Some(sql), msg));
        }
        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> u64 {
        // SAFETY: db is valid
        let changes = unsafe { ffi::sqlite3_changes(self.db) };
        changes.max(0) as u64
    }

    fn prepare(&self, sql: &str, params: &[Value]) -> Result<Statement> {
        let c_sql = CString::new(sql).map_err(|_| nul_error(sql))?;
        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.db,
                c_sql.as_ptr(),
                c_sql.as_bytes().len() as c_int,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            return Err(self.last_error(sql));
        }
        let stmt = Statement(stmt);

        for (i, param) in params.iter().enumerate() {
            // SAFETY: stmt is valid, index is 1-based
            let rc = unsafe { types::bind_value(stmt.0, (i + 1) as c_int, param) };
            if rc != ffi::SQLITE_OK {
                // SAFETY: db is valid
                let msg = unsafe { ffi::error_message(self.db) };
                return Err(Error::query_failed(
                    QueryErrorKind::Database,
                    Some(sql),
                    format!("Failed to bind parameter {}: {}", i + 1, msg),
                ));
            }
        }
        Ok(stmt)
    }

    fn last_error(&self, sql: &str) -> Error {
        // SAFETY: db is valid
        let (msg, code) = unsafe { (ffi::error_message(self.db), ffi::sqlite3_errcode(self.db)) };
        Error::query_failed(error_code_to_kind(code), Some(sql), msg)
    }
}

impl Driver for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let stmt = self.prepare(sql, params)?;

        // SAFETY: stmt is valid
        let col_count = unsafe { ffi::sqlite3_column_count(stmt.0) };
        let names = (0..col_count)
            .map(|i| {
                // SAFETY: stmt is valid and i is in range
                unsafe { types::column_name(stmt.0, i) }.unwrap_or_else(|| format!("col{i}"))
            })
            .collect();
        let columns = Arc::new(ColumnInfo::new(names));

        let mut rows = Vec::new();
        loop {
            // SAFETY: stmt is valid
            match unsafe { ffi::sqlite3_step(stmt.0) } {
                ffi::SQLITE_ROW => {
                    let values = (0..col_count)
                        // SAFETY: stmt is valid, we just got SQLITE_ROW
                        .map(|i| unsafe { types::read_column(stmt.0, i) })
                        .collect();
                    rows.push(Row::with_columns(Arc::clone(&columns), values));
                }
                ffi::SQLITE_DONE => break,
                _ => return Err(self.last_error(sql)),
            }
        }
        Ok(rows)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let stmt = self.prepare(sql, params)?;
        // SAFETY: stmt is valid
        match unsafe { ffi::sqlite3_step(stmt.0) } {
            ffi::SQLITE_DONE | ffi::SQLITE_ROW => Ok(self.changes()),
            _ => Err(self.last_error(sql)),
        }
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>> {
        Ok(Some(self.last_insert_rowid()).filter(|id| *id > 0))
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: db is valid and not used after this point
            unsafe {
                ffi::sqlite3_close_v2(self.db);
            }
        }
    }
}

/// A prepared statement, finalized on drop.
struct Statement(*mut ffi::sqlite3_stmt);

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: the statement came from sqlite3_prepare_v2; finalize accepts null
        unsafe {
            ffi::sqlite3_finalize(self.0);
        }
    }
}

/// Opens [`SqliteConnection`]s for `sqlite://` connection strings.
///
/// `sqlite://:memory:` (or `sqlite://memory`) opens a private in-memory
/// database; anything else is a file path.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnector {
    template: SqliteConfig,
}

impl SqliteConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config`'s flags and busy timeout for every connection; the path
    /// always comes from the connection string.
    pub fn with_config(config: SqliteConfig) -> Self {
        Self { template: config }
    }
}

impl Connector for SqliteConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn connect(&self, info: &ConnectionInfo) -> Result<Box<dyn Driver>> {
        let path = if info.is_memory() {
            ":memory:".to_string()
        } else {
            info.db
                .clone()
                .ok_or_else(|| Error::connection_failed("No database path given"))?
        };
        let config = SqliteConfig {
            path,
            ..self.template.clone()
        };
        Ok(Box::new(SqliteConnection::open(&config)?))
    }
}

fn nul_error(sql: &str) -> Error {
    Error::query_failed(QueryErrorKind::Syntax, Some(sql), "SQL contains null byte")
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_ERROR => QueryErrorKind::Syntax,
        _ => QueryErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> SqliteConnection {
        let mut conn = SqliteConnection::open_memory().unwrap();
        conn.execute_batch("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)")
            .unwrap();
        conn
    }

    #[test]
    fn test_open_memory() {
        let conn = SqliteConnection::open_memory().unwrap();
        assert_eq!(conn.path(), ":memory:");
    }

    #[test]
    fn test_execute_batch() {
        let mut conn = open();
        conn.execute_batch("INSERT INTO test (name) VALUES ('Alice'); INSERT INTO test (name) VALUES ('Bob')")
            .unwrap();
        assert_eq!(conn.changes(), 1);
        assert_eq!(conn.last_insert_rowid(), 2);
    }

    #[test]
    fn test_parameterized_query() {
        let mut conn = open();
        let changed = conn
            .execute(
                "INSERT INTO test (name, age) VALUES (?, ?)",
                &[Value::Text("Alice".to_string()), Value::Int(30)],
            )
            .unwrap();
        assert_eq!(changed, 1);

        let rows = conn
            .query(
                "SELECT * FROM test WHERE name = ?",
                &[Value::Text("Alice".to_string())],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(rows[0].get_by_name("age").and_then(Value::as_i64), Some(30));
        assert_eq!(conn.last_insert_id().unwrap(), Some(1));
    }

    #[test]
    fn test_null_handling() {
        let mut conn = open();
        conn.execute("INSERT INTO test (name) VALUES (?)", &[Value::Null])
            .unwrap();
        let rows = conn.query("SELECT name FROM test", &[]).unwrap();
        assert_eq!(rows[0].get(0), Some(&Value::Null));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_type_conversions() {
        let mut conn = SqliteConnection::open_memory().unwrap();
        conn.execute_batch("CREATE TABLE types (b BOOLEAN, i INTEGER, f REAL, t TEXT, bl BLOB)")
            .unwrap();
        conn.execute(
            "INSERT INTO types VALUES (?, ?, ?, ?, ?)",
            &[
                Value::Bool(true),
                Value::Int(42),
                Value::Double(3.14),
                Value::Text("hello".to_string()),
                Value::Bytes(vec![1, 2, 3]),
            ],
        )
        .unwrap();

        let rows = conn.query("SELECT * FROM types", &[]).unwrap();
        let row = &rows[0];
        assert_eq!(row.get_by_name("b"), Some(&Value::Int(1)));
        assert_eq!(row.get_by_name("i"), Some(&Value::Int(42)));
        assert!((row.get_by_name("f").and_then(Value::as_f64).unwrap() - 3.14).abs() < 0.001);
        assert_eq!(row.get_by_name("t"), Some(&Value::Text("hello".into())));
        assert_eq!(row.get_by_name("bl"), Some(&Value::Bytes(vec![1, 2, 3])));
    }

    #[test]
    fn test_syntax_error_carries_engine_message() {
        let mut conn = open();
        let err = conn.query("alsdkjfsdf", &[]).unwrap_err();
        assert!(err.is_query_failed());
        assert!(err.to_string().contains("alsdkjfsdf"));

        let err = conn.query("select * from an_invalid_column", &[]).unwrap_err();
        assert!(err.to_string().contains("an_invalid_column"));
    }

    #[test]
    fn test_constraint_violation() {
        let mut conn = open();
        conn.execute("INSERT INTO test (id, name) VALUES (1, 'a')", &[])
            .unwrap();
        let err = conn
            .execute("INSERT INTO test (id, name) VALUES (1, 'b')", &[])
            .unwrap_err();
        match err {
            Error::Query(q) => assert_eq!(q.kind, QueryErrorKind::Constraint),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_connector_opens_memory_and_rejects_bad_path() {
        let connector = SqliteConnector::new();
        let info = ConnectionInfo::parse("sqlite://:memory:").unwrap();
        let mut driver = connector.connect(&info).unwrap();
        assert_eq!(driver.dialect(), Dialect::Sqlite);
        assert_eq!(driver.query("SELECT 1 AS one", &[]).unwrap().len(), 1);

        let info =
            ConnectionInfo::parse("sqlite:///__1337__missing_dir__/__1337__invalid_db__.db").unwrap();
        let err = connector.connect(&info).err().unwrap();
        assert!(err.is_connection_failed());
    }

    #[test]
    fn test_read_only_flags() {
        let err = SqliteConnection::open(
            &SqliteConfig::file("/__1337__missing_dir__/ro.db").flags(OpenFlags::read_only()),
        )
        .unwrap_err();
        assert!(err.is_connection_failed());
    }
}
