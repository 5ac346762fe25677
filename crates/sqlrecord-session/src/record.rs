//! Dynamic records and attribute assignment.

use crate::table::Table;
use sqlrecord_core::{
    AttributeError, AttributeErrorKind, DateTime, Error, FromValue, Result, Row, Value,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Row-number column Oracle pagination adds to every row.
pub(crate) const ROW_NUMBER_COLUMN: &str = "ar_rnum__";

/// Alias under which batched join queries select the owner's key.
pub(crate) const OWNER_KEY_COLUMN: &str = "ar_owner_key__";

/// The attribute-assignment operations the relationship engine relies on.
pub trait AttributeAssignment {
    /// Set one attribute, bypassing `attr_accessible` / `attr_protected`.
    fn assign_attribute(&mut self, name: &str, value: Value) -> Result<()>;

    /// Mass-assign attributes through the model's guard lists.
    ///
    /// Attributes the guard rejects are skipped silently. Names that are
    /// neither columns nor existing attributes fail with
    /// [`AttributeErrorKind::Undefined`] after the valid ones are applied.
    fn set_attributes(&mut self, attributes: &[(&str, Value)]) -> Result<()>;
}

/// An association attached to a record by eager loading.
#[derive(Debug, Clone)]
pub enum Loaded {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Loaded {
    pub fn one(record: Option<Record>) -> Self {
        Loaded::One(record.map(Box::new))
    }

    /// The single record of a to-one association.
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Loaded::One(record) => record.as_deref(),
            Loaded::Many(records) => records.first(),
        }
    }

    pub fn as_many(&self) -> &[Record] {
        match self {
            Loaded::One(Some(record)) => std::slice::from_ref(record.as_ref()),
            Loaded::One(None) => &[],
            Loaded::Many(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        self.as_many().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_many().is_empty()
    }

    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Loaded::One(record) => record.map(|r| vec![*r]).unwrap_or_default(),
            Loaded::Many(records) => records,
        }
    }
}

/// An attribute bag bound to its table descriptor.
///
/// Attribute names are stored inflected (`variablize`d), matching the
/// primary-key and foreign-key names the relationship engine computes.
#[derive(Clone)]
pub struct Record {
    table: Arc<Table>,
    attributes: BTreeMap<String, Value>,
    dirty: BTreeSet<String>,
    associations: BTreeMap<String, Loaded>,
    readonly: bool,
    persisted: bool,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("class", &self.table.class_name())
            .field("attributes", &self.attributes)
            .field("dirty", &self.dirty)
            .field("associations", &self.associations.keys().collect::<Vec<_>>())
            .field("readonly", &self.readonly)
            .field("persisted", &self.persisted)
            .finish()
    }
}

impl Record {
    /// A new, unsaved record with every column at its default.
    pub fn new(table: Arc<Table>) -> Self {
        let attributes = table
            .columns()
            .iter()
            .map(|c| (c.inflected_name.clone(), c.default.clone().unwrap_or(Value::Null)))
            .collect();
        Self {
            table,
            attributes,
            dirty: BTreeSet::new(),
            associations: BTreeMap::new(),
            readonly: false,
            persisted: false,
        }
    }

    /// A persisted record from a result row.
    ///
    /// Values are cast through the column catalog; columns the catalog does
    /// not know (computed selects, joined columns) are kept as read.
    pub(crate) fn hydrate(
        table: Arc<Table>,
        row: Row,
        readonly: bool,
        parse_datetime: &dyn Fn(&str) -> Option<DateTime>,
    ) -> Self {
        let mut attributes = BTreeMap::new();
        for (name, value) in row.into_pairs() {
            if name.eq_ignore_ascii_case(ROW_NUMBER_COLUMN) {
                continue;
            }
            let key = table.inflector().variablize(&name);
            let value = match table.column_for(&key) {
                Some(column) => column.cast(value, parse_datetime),
                None => value,
            };
            attributes.insert(key, value);
        }
        Self {
            table,
            attributes,
            dirty: BTreeSet::new(),
            associations: BTreeMap::new(),
            readonly,
            persisted: true,
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn class_name(&self) -> &str {
        self.table.class_name()
    }

    fn key(&self, name: &str) -> String {
        self.table.inflector().variablize(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(&self.key(name))
    }

    /// Typed attribute access; a missing attribute reads as NULL.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        T::from_value(self.get(name).unwrap_or(&Value::Null))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(&self.key(name))
    }

    /// Values of `names`, or `None` if any of them is absent or NULL.
    pub fn key_values(&self, names: &[String]) -> Option<Vec<Value>> {
        if names.is_empty() {
            return None;
        }
        names
            .iter()
            .map(|name| self.get(name).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    /// Primary-key values, or `None` for a record without a full key.
    pub fn pk_values(&self) -> Option<Vec<Value>> {
        self.key_values(self.table.pk())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn dirty_attributes(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_new_record(&self) -> bool {
        !self.persisted
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    /// An association attached by eager loading.
    pub fn association(&self, name: &str) -> Option<&Loaded> {
        self.associations.get(name)
    }

    pub(crate) fn set_association(&mut self, name: &str, loaded: Loaded) {
        self.associations.insert(name.to_string(), loaded);
    }

    pub(crate) fn take_attribute(&mut self, name: &str) -> Option<Value> {
        let key = self.key(name);
        self.dirty.remove(&key);
        self.attributes.remove(&key)
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = true;
        self.dirty.clear();
    }

    /// Column-backed attributes as `(column name, value)`, optionally only the dirty ones.
    pub(crate) fn column_values(&self, dirty_only: bool) -> Vec<(String, Value)> {
        self.attributes
            .iter()
            .filter(|(key, _)| !dirty_only || self.dirty.contains(*key))
            .filter_map(|(key, value)| {
                self.table
                    .column_for(key)
                    .map(|column| (column.name.clone(), value.clone()))
            })
            .collect()
    }
}

impl AttributeAssignment for Record {
    fn assign_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        let key = self.key(name);
        let value = match self.table.column_for(&key) {
            Some(column) => column.cast(value, &DateTime::parse),
            None => value,
        };
        self.attributes.insert(key.clone(), value);
        self.dirty.insert(key);
        Ok(())
    }

    fn set_attributes(&mut self, attributes: &[(&str, Value)]) -> Result<()> {
        let mut undefined = Vec::new();
        for (name, value) in attributes {
            let key = self.key(name);
            if !self.table.class().is_mass_assignable(&key) {
                tracing::trace!(class = %self.class_name(), attribute = %key, "Guarded attribute skipped");
                continue;
            }
            if self.table.column_for(&key).is_none() && !self.attributes.contains_key(&key) {
                undefined.push((*name).to_string());
                continue;
            }
            self.assign_attribute(&key, value.clone())?;
        }

        if undefined.is_empty() {
            Ok(())
        } else {
            Err(Error::Attribute(AttributeError {
                kind: AttributeErrorKind::Undefined,
                model: self.class_name().to_string(),
                attributes: undefined,
            }))
        }
    }
}
