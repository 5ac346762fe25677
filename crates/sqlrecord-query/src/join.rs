//! JOIN clause types.

use sqlrecord_core::Dialect;

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Type of join
    pub join_type: JoinType,
    /// Table to join, unquoted
    pub table: String,
    /// Optional table alias
    pub alias: Option<String>,
    /// ON condition, already rendered
    pub on: String,
}

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

impl Join {
    /// Create an INNER JOIN.
    pub fn inner(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            join_type: JoinType::Inner,
            table: table.into(),
            alias: None,
            on: on.into(),
        }
    }

    /// Create a LEFT JOIN.
    pub fn left(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            join_type: JoinType::Left,
            table: table.into(),
            alias: None,
            on: on.into(),
        }
    }

    /// Set an alias for the joined table.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// `INNER JOIN bridge ON(target.pk = bridge.fk)`.
    ///
    /// Joins `table` to rows of `from_table` whose `from_column` equals
    /// `table.column`. This is the shape of every association join: the
    /// through bridge and the many-to-many join table.
    pub fn on_columns(
        dialect: Dialect,
        table: &str,
        column: &str,
        from_table: &str,
        from_column: &str,
    ) -> Self {
        let on = format!(
            "{} = {}",
            dialect.quote_qualified(from_table, from_column),
            dialect.quote_qualified(table, column)
        );
        Self::inner(table, on)
    }

    /// Generate SQL for this join.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = format!(
            "{} {}",
            self.join_type.as_str(),
            dialect.quote_identifier(&self.table)
        );
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(alias));
        }
        sql.push_str(" ON(");
        sql.push_str(&self.on);
        sql.push(')');
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_keywords() {
        assert_eq!(JoinType::Inner.as_str(), "INNER JOIN");
        assert_eq!(JoinType::Left.as_str(), "LEFT JOIN");
    }

    #[test]
    fn test_on_columns_bridge_join() {
        let join = Join::on_columns(Dialect::Mysql, "payments", "person_id", "people", "id");
        assert_eq!(
            join.to_sql(Dialect::Mysql),
            "INNER JOIN `payments` ON(`people`.`id` = `payments`.`person_id`)"
        );
    }

    #[test]
    fn test_join_with_alias() {
        let join = Join::left("schools", "s.id = people.school_id").alias("s");
        assert_eq!(
            join.to_sql(Dialect::Sqlite),
            "LEFT JOIN \"schools\" AS \"s\" ON(s.id = people.school_id)"
        );
    }
}
