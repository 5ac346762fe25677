//! The adapter handle: one open connection plus its dialect.

use sqlrecord_core::{
    Columns, Config, ConnectionInfo, Connector, Cursor, Date, DateClassDescriptor, DateTime, Dialect,
    Driver, EnglishInflector, Error, Inflector, Logger, Result, Row, TransactionError,
    TransactionErrorKind, Value,
};
use sqlrecord_schema::Introspector;
use std::sync::Arc;

/// Layouts used to hand engine timestamps to the configured date class.
const NAIVE_FORMAT: &str = "Y-m-d H:i:s.u";
const ZONED_FORMAT: &str = "Y-m-d H:i:s.u T";
const OFFSET_FORMAT: &str = "Y-m-d H:i:s.u P";

/// A live connection and everything needed to speak its dialect.
///
/// An adapter is not meant for concurrent use: it holds at most one open
/// transaction and remembers the last statement it ran.
pub struct Adapter {
    driver: Box<dyn Driver>,
    info: ConnectionInfo,
    dialect: Dialect,
    introspector: Introspector,
    inflector: Arc<dyn Inflector>,
    logging: bool,
    logger: Option<Arc<dyn Logger>>,
    date_class: DateClassDescriptor,
    last_query: Option<String>,
    in_transaction: bool,
    dsn_params: String,
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("connection", &self.info.to_string())
            .field("dialect", &self.dialect)
            .field("last_query", &self.last_query)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

impl Adapter {
    /// Connect through `connector` and apply the connection's charset.
    pub fn open(connector: &dyn Connector, info: ConnectionInfo, config: &Config) -> Result<Self> {
        let driver = connector.connect(&info).map_err(|e| match e {
            Error::Connection(_) => e,
            other => Error::connection_failed(other.to_string()),
        })?;
        let mut adapter = Self::new(driver, info, config);
        // Dialects taking the charset in the DSN already received it from `connect`.
        if let Some(charset) = adapter.info.charset.clone().filter(|_| adapter.dsn_params.is_empty()) {
            adapter.set_encoding(&charset)?;
        }
        tracing::info!(
            connection = %adapter.info,
            dialect = %adapter.dialect,
            "Connected"
        );
        Ok(adapter)
    }

    /// Wrap an already-open driver.
    pub fn new(driver: Box<dyn Driver>, info: ConnectionInfo, config: &Config) -> Self {
        let dialect = driver.dialect();
        let dsn_params = info.dsn_params();
        Self {
            driver,
            info,
            dialect,
            introspector: Introspector::new(dialect),
            inflector: Arc::new(EnglishInflector),
            logging: config.logging(),
            logger: config.logger().cloned(),
            date_class: config.date_class(),
            last_query: None,
            in_transaction: false,
            dsn_params,
        }
    }

    /// Use `inflector` for column name inflection.
    pub fn with_inflector(mut self, inflector: Arc<dyn Inflector>) -> Self {
        self.inflector = inflector;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Scheme of the connection string this adapter was opened from.
    pub fn protocol(&self) -> &str {
        &self.info.protocol
    }

    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn default_port(&self) -> u16 {
        self.dialect.default_port()
    }

    pub fn quote_character(&self) -> char {
        self.dialect.quote_character()
    }

    pub fn supports_sequences(&self) -> bool {
        self.dialect.supports_sequences()
    }

    /// The most recent statement sent to the engine.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Extra DSN parameters passed to the driver (Oracle carries its charset here).
    pub fn dsn_params(&self) -> &str {
        &self.dsn_params
    }

    pub fn inflector(&self) -> &Arc<dyn Inflector> {
        &self.inflector
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    pub fn escape_literal(&self, value: &str) -> String {
        self.dialect.escape_literal(value)
    }

    /// Rewrite `sql` to return at most `limit` rows starting at `offset`.
    pub fn paginate(&self, sql: &str, offset: Option<u64>, limit: Option<u64>) -> String {
        self.dialect.paginate(sql, offset, limit)
    }

    /// Execute a statement with positional `?` parameters.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Cursor> {
        self.before_statement(sql, params);
        let rows = self
            .driver
            .query(sql, params)
            .map_err(|e| attach_sql(e, sql))?;
        Ok(Cursor::new(rows))
    }

    /// Execute a statement and return the number of affected rows.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.before_statement(sql, params);
        self.driver
            .execute(sql, params)
            .map_err(|e| attach_sql(e, sql))
    }

    /// Run `sql` and hand every row to `handler`.
    pub fn query_and_fetch<F>(&mut self, sql: &str, params: &[Value], mut handler: F) -> Result<()>
    where
        F: FnMut(Row),
    {
        for row in self.query(sql, params)? {
            handler(row);
        }
        Ok(())
    }

    /// First column of the first row, if any.
    pub fn query_and_fetch_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        Ok(self
            .query(sql, params)?
            .fetch()
            .and_then(|row| row.get(0).cloned()))
    }

    /// Raw introspection rows describing the columns of `table`.
    pub fn query_column_info(&mut self, table: &str) -> Result<Cursor> {
        let query = self.introspector.columns_query(table);
        self.query(&query.sql, &query.params)
    }

    /// Raw introspection rows naming the tables of the current schema.
    pub fn query_for_tables(&mut self) -> Result<Cursor> {
        let query = self.introspector.tables_query();
        self.query(&query.sql, &query.params)
    }

    /// The column catalog of `table`.
    pub fn columns(&mut self, table: &str) -> Result<Columns> {
        let rows = self.query_column_info(table)?.fetch_all();
        Ok(self.introspector.columns(&rows, self.inflector.as_ref()))
    }

    /// Tables visible in the current schema.
    pub fn tables(&mut self) -> Result<Vec<String>> {
        let introspector = self.introspector;
        Ok(self
            .query_for_tables()?
            .filter_map(|row| introspector.table_name(&row))
            .collect())
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Open a transaction. Transactions do not nest.
    pub fn transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::AlreadyActive,
                message: "A transaction is already active on this connection".to_string(),
            }));
        }
        tracing::debug!(connection = %self.info, "BEGIN");
        self.driver.begin()?;
        self.in_transaction = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::no_active_transaction());
        }
        tracing::debug!(connection = %self.info, "COMMIT");
        // A failed COMMIT leaves the engine transaction open
        self.driver.commit()?;
        self.in_transaction = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::no_active_transaction());
        }
        tracing::debug!(connection = %self.info, "ROLLBACK");
        self.driver.rollback()?;
        self.in_transaction = false;
        Ok(())
    }

    /// Id generated by the last insert.
    ///
    /// On sequence dialects, pass the sequence feeding the table's primary key.
    pub fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<Option<i64>> {
        if let Some(sql) = sequence.and_then(|s| self.dialect.current_sequence_value_sql(s)) {
            return Ok(self
                .query_and_fetch_one(&sql, &[])?
                .and_then(|v| v.as_i64()));
        }
        self.driver.last_insert_id()
    }

    /// Draw the next value from `sequence`; `None` on dialects without sequences.
    pub fn next_sequence_value(&mut self, sequence: &str) -> Result<Option<i64>> {
        match self.dialect.next_sequence_value_sql(sequence) {
            Some(sql) => Ok(self
                .query_and_fetch_one(&sql, &[])?
                .and_then(|v| v.as_i64())),
            None => Ok(None),
        }
    }

    pub fn sequence_name_for(&self, table: &str, column: &str) -> Result<String> {
        self.dialect.sequence_name_for(table, column)
    }

    pub fn datetime_to_string(&self, value: &DateTime) -> String {
        self.dialect.datetime_to_string(value)
    }

    pub fn date_to_string(&self, value: &Date) -> String {
        self.dialect.date_to_string(value)
    }

    /// Parse an engine timestamp through the configured date class.
    pub fn string_to_datetime(&self, text: &str) -> Option<DateTime> {
        let parsed = DateTime::parse(text).or_else(|| {
            DateTime::create_from_format(self.dialect.datetime_format(), text.trim())
        })?;
        let pattern = match parsed.zone() {
            None => NAIVE_FORMAT,
            Some(zone) if zone.abbreviation().is_some() => ZONED_FORMAT,
            Some(_) => OFFSET_FORMAT,
        };
        self.date_class.parse(pattern, &parsed.format(pattern))
    }

    /// Switch the client encoding.
    pub fn set_encoding(&mut self, charset: &str) -> Result<()> {
        match self.dialect {
            Dialect::Oci => {
                // Only a new connection opened with these params picks it up.
                self.dsn_params = self.dialect.dsn_params(charset).unwrap_or_default();
                Ok(())
            }
            Dialect::Sqlite => {
                tracing::warn!(charset = %charset, "SQLite does not support setting the charset");
                Ok(())
            }
            Dialect::Mysql | Dialect::Pgsql => {
                if let Some(sql) = self.dialect.set_encoding_sql() {
                    self.execute(sql, &[Value::Text(charset.to_string())])?;
                }
                Ok(())
            }
        }
    }

    fn before_statement(&mut self, sql: &str, params: &[Value]) {
        tracing::debug!(sql = %sql, params = params.len(), "Executing statement");
        self.last_query = Some(sql.to_string());
        if self.logging {
            if let Some(logger) = &self.logger {
                logger.log(sql);
                if !params.is_empty() {
                    logger.log(&render_params(params));
                }
            }
        }
    }
}

fn render_params(params: &[Value]) -> String {
    let rendered: Vec<String> = params
        .iter()
        .map(|value| match value {
            Value::Text(s) => format!("'{s}'"),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", rendered.join(", "))
}

fn attach_sql(err: Error, sql: &str) -> Error {
    match err {
        Error::Query(mut query) if query.sql.is_none() => {
            query.sql = Some(sql.to_string());
            Error::Query(query)
        }
        other => other,
    }
}
