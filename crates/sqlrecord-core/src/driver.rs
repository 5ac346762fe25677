//! Driver traits: the engine-facing half of the connection layer.
//!
//! A [`Connector`] performs the handshake for one dialect and hands back a
//! boxed [`Driver`]. Everything above this layer talks to engines only through
//! these two traits, which is how networked engines are plugged in by the host.

use crate::Result;
use crate::dialect::Dialect;
use crate::row::{ColumnInfo, Row};
use crate::url::ConnectionInfo;
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// An open engine connection.
///
/// Placeholders are positional `?` markers; drivers whose engine uses another
/// syntax rewrite them before preparing the statement.
pub trait Driver: Send {
    /// Dialect spoken by this connection.
    fn dialect(&self) -> Dialect;

    /// Execute a statement and return every row it produced.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.query(sql, params).map(|_| 0)
    }

    /// Id generated by the most recent insert, for engines that track one.
    fn last_insert_id(&mut self) -> Result<Option<i64>> {
        Ok(None)
    }

    fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN TRANSACTION", &[]).map(|_| ())
    }

    fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT", &[]).map(|_| ())
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK", &[]).map(|_| ())
    }
}

/// Factory for [`Driver`]s of one dialect.
pub trait Connector: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Open a connection; failures must surface as `ConnectionFailed`.
    ///
    /// Connectors whose engine takes options in the DSN append
    /// [`ConnectionInfo::dsn_params`] to it.
    fn connect(&self, info: &ConnectionInfo) -> Result<Box<dyn Driver>>;
}

/// Rows produced by a statement, consumed front to back.
#[derive(Debug, Default)]
pub struct Cursor {
    columns: Arc<ColumnInfo>,
    rows: VecDeque<Row>,
}

impl Cursor {
    pub fn new(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(Row::column_info)
            .unwrap_or_default();
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Next row, or `None` once the result set is exhausted.
    pub fn fetch(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Drain the remaining rows.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    /// Column names of the result set; empty when no row was returned.
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Rows not fetched yet.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.fetch()
    }
}
