//! SELECT assembly.

use crate::options::FindOptions;
use sqlrecord_core::{Dialect, Value};

/// How many records a finder wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    All,
    /// The first matching record; forces `LIMIT 1`.
    First,
}

/// A SELECT statement for one table, shaped by [`FindOptions`].
#[derive(Debug, Clone)]
pub struct Select<'a> {
    table: &'a str,
    options: &'a FindOptions,
    mode: FindMode,
    extra_columns: Vec<String>,
}

impl<'a> Select<'a> {
    /// Select from `table` (unquoted).
    pub fn new(table: &'a str, options: &'a FindOptions) -> Self {
        Self {
            table,
            options,
            mode: FindMode::All,
            extra_columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: FindMode) -> Self {
        self.mode = mode;
        self
    }

    /// Append a column expression after the selected columns.
    #[must_use]
    pub fn extra_column(mut self, expr: impl Into<String>) -> Self {
        self.extra_columns.push(expr.into());
        self
    }

    /// Build the SQL and its parameters.
    ///
    /// Pagination goes through [`Dialect::paginate`] only when a limit or an
    /// offset is present; an unpaginated finder returns every row.
    pub fn build(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let options = self.options;
        let table = dialect.quote_identifier(self.table);
        let has_joins = !options.joins.is_empty() || !options.structured_joins.is_empty();

        let mut columns = match &options.select {
            Some(select) => select.clone(),
            None if has_joins || !self.extra_columns.is_empty() => format!("{table}.*"),
            None => "*".to_string(),
        };
        for extra in &self.extra_columns {
            columns.push_str(", ");
            columns.push_str(extra);
        }

        let mut sql = format!("SELECT {columns} FROM {table}");
        for join in &options.structured_joins {
            sql.push(' ');
            sql.push_str(&join.to_sql(dialect));
        }
        for join in &options.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !options.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(options.conditions.sql());
        }
        if let Some(group) = &options.group {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }
        if let Some(having) = &options.having {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }
        if let Some(order) = &options.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        let limit = match self.mode {
            FindMode::First => Some(1),
            FindMode::All => options.limit,
        };
        if limit.is_some() || options.offset.is_some() {
            sql = dialect.paginate(&sql, options.offset, limit);
        }

        (sql, options.conditions.params().to_vec())
    }
}
