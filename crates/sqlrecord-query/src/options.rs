//! Finder options.

use crate::clause::Conditions;
use crate::include::{IncludePath, merge_into};
use crate::join::Join;
use sqlrecord_core::Value;

/// Options accepted by the finders and carried by association declarations.
///
/// `joins` holds raw fragments (`"INNER JOIN payments ON(...)"`) alongside the
/// structured [`Join`]s the relationship engine builds.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub conditions: Conditions,
    pub select: Option<String>,
    pub joins: Vec<String>,
    pub structured_joins: Vec<Join>,
    pub order: Option<String>,
    pub group: Option<String>,
    pub having: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub include: Vec<IncludePath>,
    pub readonly: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// AND a raw condition fragment with the existing conditions.
    #[must_use]
    pub fn conditions(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.conditions = std::mem::take(&mut self.conditions).and(Conditions::new(sql, params));
        self
    }

    /// AND an already-built condition with the existing conditions.
    #[must_use]
    pub fn and_where(mut self, conditions: Conditions) -> Self {
        self.conditions = std::mem::take(&mut self.conditions).and(conditions);
        self
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Append a raw join fragment.
    #[must_use]
    pub fn joins(mut self, fragment: impl Into<String>) -> Self {
        self.joins.push(fragment.into());
        self
    }

    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.structured_joins.push(join);
        self
    }

    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn having(mut self, having: impl Into<String>) -> Self {
        self.having = Some(having.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Eager-load the associations named by dotted paths.
    #[must_use]
    pub fn include(mut self, paths: &[&str]) -> Self {
        for path in IncludePath::parse_list(paths.iter().copied()) {
            merge_into(&mut self.include, path);
        }
        self
    }

    #[must_use]
    pub fn include_path(mut self, path: IncludePath) -> Self {
        merge_into(&mut self.include, path);
        self
    }

    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Whether the query needs a paginate pass.
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions_are_anded() {
        let options = FindOptions::new()
            .conditions("amount > ?", vec![Value::Int(10)])
            .conditions("status = ?", vec![Value::from("paid")]);
        assert_eq!(options.conditions.sql(), "(amount > ?) AND (status = ?)");
        assert_eq!(options.conditions.params().len(), 2);
    }

    #[test]
    fn test_include_merges() {
        let options = FindOptions::new()
            .include(&["people"])
            .include(&["people.payments", "principal"]);
        assert_eq!(options.include.len(), 2);
        assert_eq!(options.include[0].nested[0].relationship, "payments");
    }

    #[test]
    fn test_is_paginated() {
        assert!(!FindOptions::new().is_paginated());
        assert!(FindOptions::new().limit(1).is_paginated());
        assert!(FindOptions::new().offset(3).is_paginated());
    }
}
