//! Model class declarations.
//!
//! A [`ModelClass`] is the static description of an entity: where it lives,
//! which attributes mass-assignment may touch, and which associations it
//! declares. Nothing here talks to the database; the session turns a class
//! into a [`Table`](crate::table::Table) on first use.

use sqlrecord_core::Value;
use sqlrecord_query::Conditions;

/// The four association shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    HasMany,
    HasOne,
    BelongsTo,
    HasAndBelongsToMany,
}

impl AssociationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssociationKind::HasMany => "has_many",
            AssociationKind::HasOne => "has_one",
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::HasAndBelongsToMany => "has_and_belongs_to_many",
        }
    }
}

/// Options of one association declaration.
///
/// Unset keys and class names are inferred from the owner and association
/// names when the relationship is built.
#[derive(Debug, Clone, Default)]
pub struct RelationshipOptions {
    pub class_name: Option<String>,
    pub foreign_key: Vec<String>,
    pub primary_key: Vec<String>,
    pub through: Option<String>,
    pub source: Option<String>,
    pub join_table: Option<String>,
    pub association_foreign_key: Option<String>,
    pub conditions: Conditions,
    pub select: Option<String>,
    pub joins: Vec<String>,
    pub order: Option<String>,
    pub group: Option<String>,
    pub having: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub readonly: bool,
}

impl RelationshipOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = vec![column.into()];
        self
    }

    /// Composite foreign key, paired positionally with the primary key.
    #[must_use]
    pub fn foreign_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.foreign_key = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = vec![column.into()];
        self
    }

    #[must_use]
    pub fn primary_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Reach the target through another association of the same owner.
    #[must_use]
    pub fn through(mut self, association: impl Into<String>) -> Self {
        self.through = Some(association.into());
        self
    }

    /// Class a through association returns, when it differs from the name.
    #[must_use]
    pub fn source(mut self, class_name: impl Into<String>) -> Self {
        self.source = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn join_table(mut self, table: impl Into<String>) -> Self {
        self.join_table = Some(table.into());
        self
    }

    #[must_use]
    pub fn association_foreign_key(mut self, column: impl Into<String>) -> Self {
        self.association_foreign_key = Some(column.into());
        self
    }

    #[must_use]
    pub fn conditions(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.conditions = std::mem::take(&mut self.conditions).and(Conditions::new(sql, params));
        self
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    #[must_use]
    pub fn joins(mut self, fragment: impl Into<String>) -> Self {
        self.joins.push(fragment.into());
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

    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }
}

/// One declared association.
#[derive(Debug, Clone)]
pub struct AssociationDecl {
    pub kind: AssociationKind,
    pub name: String,
    pub options: RelationshipOptions,
}

/// Static description of an entity.
#[derive(Debug, Clone)]
pub struct ModelClass {
    name: String,
    table_name: Option<String>,
    primary_key: Vec<String>,
    connection: Option<String>,
    sequence: Option<String>,
    attr_accessible: Vec<String>,
    attr_protected: Vec<String>,
    associations: Vec<AssociationDecl>,
}

impl ModelClass {
    /// Declare a class such as `"School"`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            primary_key: Vec::new(),
            connection: None,
            sequence: None,
            attr_accessible: Vec::new(),
            attr_protected: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Override the tableized class name.
    #[must_use]
    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    /// Override the primary key reported by the column catalog.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Connection name; the default connection when unset.
    #[must_use]
    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = Some(name.into());
        self
    }

    #[must_use]
    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Only these attributes may be mass-assigned.
    #[must_use]
    pub fn attr_accessible<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attr_accessible = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// These attributes are never mass-assigned.
    #[must_use]
    pub fn attr_protected<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attr_protected = attributes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn has_many(self, name: impl Into<String>, options: RelationshipOptions) -> Self {
        self.associate(AssociationKind::HasMany, name, options)
    }

    #[must_use]
    pub fn has_one(self, name: impl Into<String>, options: RelationshipOptions) -> Self {
        self.associate(AssociationKind::HasOne, name, options)
    }

    #[must_use]
    pub fn belongs_to(self, name: impl Into<String>, options: RelationshipOptions) -> Self {
        self.associate(AssociationKind::BelongsTo, name, options)
    }

    #[must_use]
    pub fn has_and_belongs_to_many(
        self,
        name: impl Into<String>,
        options: RelationshipOptions,
    ) -> Self {
        self.associate(AssociationKind::HasAndBelongsToMany, name, options)
    }

    fn associate(
        mut self,
        kind: AssociationKind,
        name: impl Into<String>,
        options: RelationshipOptions,
    ) -> Self {
        self.associations.push(AssociationDecl {
            kind,
            name: name.into(),
            options,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn declared_primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn declared_sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    pub fn accessible(&self) -> &[String] {
        &self.attr_accessible
    }

    pub fn protected(&self) -> &[String] {
        &self.attr_protected
    }

    pub fn associations(&self) -> &[AssociationDecl] {
        &self.associations
    }

    /// Whether guarded mass-assignment may set `attribute`.
    pub fn is_mass_assignable(&self, attribute: &str) -> bool {
        if !self.attr_accessible.is_empty() && !self.attr_accessible.iter().any(|a| a == attribute) {
            return false;
        }
        !self.attr_protected.iter().any(|a| a == attribute)
    }
}
