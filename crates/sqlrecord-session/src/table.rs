//! Table descriptors.

use crate::model::ModelClass;
use crate::relationship::Relationship;
use sqlrecord_connection::Adapter;
use sqlrecord_core::{Column, Columns, Dialect, Error, Inflector, QueryErrorKind, Result};
use std::sync::Arc;

/// Everything the mapper knows about one modeled entity: resolved table
/// name, primary key, column catalog, sequence and relationships.
///
/// Built once per class by the session and shared as `Arc<Table>`; only the
/// through-state inside its relationships changes after construction.
pub struct Table {
    class: Arc<ModelClass>,
    name: String,
    dialect: Dialect,
    pk: Vec<String>,
    columns: Columns,
    sequence: Option<String>,
    relationships: Vec<Relationship>,
    inflector: Arc<dyn Inflector>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("class", &self.class.name())
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("pk", &self.pk)
            .field("columns", &self.columns.names().collect::<Vec<_>>())
            .field("sequence", &self.sequence)
            .field(
                "relationships",
                &self.relationships.iter().map(Relationship::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Table {
    /// Introspect `class`'s table through `adapter` and build its descriptor.
    pub fn load(class: Arc<ModelClass>, adapter: &mut Adapter) -> Result<Self> {
        let inflector = Arc::clone(adapter.inflector());
        let name = class
            .declared_table_name()
            .map_or_else(|| inflector.tableize(class.name()), str::to_string);

        let columns = adapter.columns(&name)?;
        if columns.is_empty() {
            return Err(Error::query_failed(
                QueryErrorKind::NotFound,
                None,
                format!("Table '{name}' for class {} has no columns", class.name()),
            ));
        }

        let pk = if class.declared_primary_key().is_empty() {
            columns.primary_key()
        } else {
            class
                .declared_primary_key()
                .iter()
                .map(|c| inflector.variablize(c))
                .collect()
        };

        let sequence = if adapter.supports_sequences() {
            match (class.declared_sequence(), pk.first()) {
                (Some(sequence), _) => Some(sequence.to_string()),
                (None, Some(pk)) => columns
                    .get_inflected(pk)
                    .and_then(|c| c.sequence.clone())
                    .or_else(|| adapter.sequence_name_for(&name, pk).ok()),
                (None, None) => None,
            }
        } else {
            class.declared_sequence().map(str::to_string)
        };

        let relationships = class
            .associations()
            .iter()
            .map(|decl| Relationship::new(class.name(), decl, inflector.as_ref()))
            .collect::<Vec<_>>();

        tracing::info!(
            class = %class.name(),
            table = %name,
            columns = columns.len(),
            primary_key = ?pk,
            relationships = relationships.len(),
            "Table descriptor built"
        );

        Ok(Self {
            dialect: adapter.dialect(),
            class,
            name,
            pk,
            columns,
            sequence,
            relationships,
            inflector,
        })
    }

    pub fn class(&self) -> &ModelClass {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Unquoted table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quoted_name(&self) -> String {
        self.dialect.quote_identifier(&self.name)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Inflected primary-key column names, composite keys in order.
    pub fn pk(&self) -> &[String] {
        &self.pk
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Column bound to an attribute name.
    pub fn column_for(&self, attribute: &str) -> Option<&Column> {
        self.columns
            .get_inflected(&self.inflector.variablize(attribute))
            .or_else(|| self.columns.get(attribute))
    }

    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    pub fn connection(&self) -> Option<&str> {
        self.class.connection_name()
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn inflector(&self) -> &dyn Inflector {
        self.inflector.as_ref()
    }
}
