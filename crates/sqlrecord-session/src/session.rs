//! The session: model registry, table descriptor cache, finders and
//! persistence.

use crate::model::ModelClass;
use crate::record::{AttributeAssignment, Loaded, Record};
use crate::table::Table;
use sqlrecord_connection::{Adapter, ConnectionRegistry, SharedAdapter};
use sqlrecord_core::{
    AssociationError, AssociationErrorKind, AttributeError, AttributeErrorKind, ConfigErrorKind,
    Dialect, Error, Result, Value,
};
use sqlrecord_query::{Conditions, FindMode, FindOptions, IncludePath, Select};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Explicit context for everything model-level.
///
/// Owns the connection registry, the registered model classes and the
/// table descriptors built from them. Descriptors are built on first use
/// and kept until [`invalidate_table`](Session::invalidate_table).
#[derive(Debug)]
pub struct Session {
    registry: ConnectionRegistry,
    classes: RwLock<HashMap<String, Arc<ModelClass>>>,
    tables: Mutex<HashMap<String, Arc<Table>>>,
}

impl Session {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self {
            registry,
            classes: RwLock::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Register `class`, builder style.
    #[must_use]
    pub fn with_model(self, class: ModelClass) -> Self {
        self.register(class);
        self
    }

    /// Register or replace a model class. Replacing drops its descriptor.
    pub fn register(&self, class: ModelClass) {
        let name = class.name().to_string();
        self.classes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.clone(), Arc::new(class));
        self.invalidate_table(&name);
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn model(&self, name: &str) -> Result<Arc<ModelClass>> {
        self.classes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::config(
                    ConfigErrorKind::UnknownModel,
                    format!("Class '{name}' is not registered"),
                )
            })
    }

    /// Table descriptor for `class`, built on first access.
    pub fn table(&self, class: &str) -> Result<Arc<Table>> {
        if let Some(table) = lock(&self.tables).get(class) {
            return Ok(Arc::clone(table));
        }

        let model = self.model(class)?;
        let adapter = self.registry.resolve(model.connection_name())?;
        let table = Arc::new(Table::load(model, &mut lock(&adapter))?);

        // A concurrent build may have won; keep the first descriptor.
        let mut tables = lock(&self.tables);
        Ok(Arc::clone(
            tables.entry(class.to_string()).or_insert(table),
        ))
    }

    /// Drop the cached descriptor for `class`. Returns whether one was cached.
    pub fn invalidate_table(&self, class: &str) -> bool {
        lock(&self.tables).remove(class).is_some()
    }

    /// Adapter owning `table`'s connection.
    pub fn adapter_for(&self, table: &Table) -> Result<SharedAdapter> {
        self.registry.resolve(table.connection())
    }

    /// A new, unsaved record of `class`.
    pub fn new_record(&self, class: &str) -> Result<Record> {
        Ok(Record::new(self.table(class)?))
    }

    /// Mass-assign `attributes` (guarded) to a new record and save it.
    pub fn create(&self, class: &str, attributes: &[(&str, Value)]) -> Result<Record> {
        let mut record = self.new_record(class)?;
        record.set_attributes(attributes)?;
        self.save(&mut record)?;
        Ok(record)
    }

    pub fn find_all(&self, class: &str, options: &FindOptions) -> Result<Vec<Record>> {
        let table = self.table(class)?;
        self.find_in(&table, options, FindMode::All, &[])
    }

    pub fn find_first(&self, class: &str, options: &FindOptions) -> Result<Option<Record>> {
        let table = self.table(class)?;
        Ok(self
            .find_in(&table, options, FindMode::First, &[])?
            .into_iter()
            .next())
    }

    /// Find by primary key; composite keys take their values in key order.
    pub fn find_by_pk(&self, class: &str, pk: &[Value]) -> Result<Option<Record>> {
        let table = self.table(class)?;
        let columns: Vec<String> = table
            .pk()
            .iter()
            .map(|attribute| {
                table
                    .column_for(attribute)
                    .map_or_else(|| attribute.clone(), |c| c.name.clone())
            })
            .collect();
        let options = FindOptions::new().and_where(Conditions::from_keys(
            table.dialect(),
            Some(table.name()),
            &columns,
            pk,
        ));
        Ok(self
            .find_in(&table, &options, FindMode::First, &[])?
            .into_iter()
            .next())
    }

    pub(crate) fn find_in(
        &self,
        table: &Arc<Table>,
        options: &FindOptions,
        mode: FindMode,
        extra_columns: &[String],
    ) -> Result<Vec<Record>> {
        let select = extra_columns
            .iter()
            .fold(Select::new(table.name(), options).mode(mode), |s, c| {
                s.extra_column(c.clone())
            });
        let (sql, params) = select.build(table.dialect());

        let adapter = self.adapter_for(table)?;
        let mut records = {
            let mut conn = lock(&adapter);
            let rows = conn.query(&sql, &params)?.fetch_all();
            let parse = |text: &str| conn.string_to_datetime(text);
            rows.into_iter()
                .map(|row| Record::hydrate(Arc::clone(table), row, options.readonly, &parse))
                .collect::<Vec<_>>()
        };
        tracing::debug!(class = %table.class_name(), records = records.len(), "Records found");

        if !options.include.is_empty() {
            self.include(&mut records, &options.include)?;
        }
        Ok(records)
    }

    /// Eager-load `includes` onto `records`, one query per association and level.
    pub fn include(&self, records: &mut [Record], includes: &[IncludePath]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let table = Arc::clone(first.table());
        for include in includes {
            let relationship = table
                .relationship(&include.relationship)
                .ok_or_else(|| unknown_association(&table, &include.relationship))?;
            relationship.load_eagerly(self, &table, &include.nested, records)?;
        }
        Ok(())
    }

    /// Load association `name` of `record` with its own query.
    ///
    /// `Ok(None)` when the record lacks the key the association needs.
    pub fn load_association(&self, record: &Record, name: &str) -> Result<Option<Loaded>> {
        let table = Arc::clone(record.table());
        table
            .relationship(name)
            .ok_or_else(|| unknown_association(&table, name))?
            .load(self, record)
    }

    pub fn build_association(
        &self,
        record: &Record,
        name: &str,
        attributes: &[(&str, Value)],
        guard: bool,
    ) -> Result<Record> {
        let table = Arc::clone(record.table());
        table
            .relationship(name)
            .ok_or_else(|| unknown_association(&table, name))?
            .build_association(self, record, attributes, guard)
    }

    pub fn create_association(
        &self,
        record: &Record,
        name: &str,
        attributes: &[(&str, Value)],
        guard: bool,
    ) -> Result<Record> {
        let table = Arc::clone(record.table());
        table
            .relationship(name)
            .ok_or_else(|| unknown_association(&table, name))?
            .create_association(self, record, attributes, guard)
    }

    /// INSERT a new record or UPDATE the dirty attributes of a persisted one.
    pub fn save(&self, record: &mut Record) -> Result<()> {
        if record.is_readonly() {
            return Err(Error::Attribute(AttributeError {
                kind: AttributeErrorKind::ReadOnly,
                model: record.class_name().to_string(),
                attributes: Vec::new(),
            }));
        }
        let table = Arc::clone(record.table());
        let adapter = self.adapter_for(&table)?;
        let mut conn = lock(&adapter);
        if record.is_new_record() {
            insert(&table, &mut conn, record)?;
        } else {
            update(&table, &mut conn, record)?;
        }
        record.mark_persisted();
        Ok(())
    }

    /// DELETE the record's row. Returns the number of rows removed.
    pub fn delete(&self, record: &Record) -> Result<u64> {
        let table = Arc::clone(record.table());
        let (sql, params) = pk_condition(&table, record)?.into_parts();
        let sql = format!("DELETE FROM {} WHERE {sql}", table.quoted_name());
        self.execute_in(&table, &sql, &params)
    }

    pub(crate) fn execute_in(&self, table: &Table, sql: &str, params: &[Value]) -> Result<u64> {
        let adapter = self.adapter_for(table)?;
        let mut conn = lock(&adapter);
        conn.execute(sql, params)
    }
}

fn insert(table: &Table, conn: &mut Adapter, record: &mut Record) -> Result<()> {
    let dialect = table.dialect();
    let single_pk = match table.pk() {
        [pk] => Some(pk.clone()),
        _ => None,
    };
    let missing_pk = |record: &Record| {
        single_pk
            .as_deref()
            .filter(|pk| record.get(pk).is_none_or(Value::is_null))
            .map(str::to_string)
    };

    // Oracle draws the key before the insert.
    if dialect == Dialect::Oci {
        if let (Some(pk), Some(sequence)) = (missing_pk(record), table.sequence()) {
            if let Some(id) = conn.next_sequence_value(sequence)? {
                record.assign_attribute(&pk, Value::Int(id))?;
            }
        }
    }

    let (columns, params): (Vec<String>, Vec<Value>) = record
        .column_values(true)
        .into_iter()
        .filter(|(column, value)| {
            !(value.is_null() && table.columns().get(column).is_some_and(|c| c.pk))
        })
        .map(|(column, value)| (dialect.quote_identifier(&column), to_wire(conn, value)))
        .unzip();

    let sql = if columns.is_empty() {
        match dialect {
            Dialect::Mysql => format!("INSERT INTO {} () VALUES()", table.quoted_name()),
            _ => format!("INSERT INTO {} DEFAULT VALUES", table.quoted_name()),
        }
    } else {
        format!(
            "INSERT INTO {}({}) VALUES({})",
            table.quoted_name(),
            columns.join(","),
            vec!["?"; params.len()].join(",")
        )
    };
    conn.execute(&sql, &params)?;

    if let Some(pk) = missing_pk(record) {
        let generated = table
            .column_for(&pk)
            .is_some_and(|c| c.auto_increment || c.sequence.is_some())
            || table.sequence().is_some();
        if generated {
            if let Some(id) = conn.last_insert_id(table.sequence())? {
                record.assign_attribute(&pk, Value::Int(id))?;
            }
        }
    }
    Ok(())
}

fn update(table: &Table, conn: &mut Adapter, record: &Record) -> Result<()> {
    let dirty = record.column_values(true);
    if dirty.is_empty() {
        return Ok(());
    }
    let dialect = table.dialect();
    let (where_sql, where_params) = pk_condition(table, record)?.into_parts();

    let assignments: Vec<String> = dirty
        .iter()
        .map(|(column, _)| format!("{}=?", dialect.quote_identifier(column)))
        .collect();
    let mut params: Vec<Value> = dirty
        .into_iter()
        .map(|(_, value)| to_wire(conn, value))
        .collect();
    params.extend(where_params);

    let sql = format!(
        "UPDATE {} SET {} WHERE {where_sql}",
        table.quoted_name(),
        assignments.join(",")
    );
    conn.execute(&sql, &params)?;
    Ok(())
}

/// `pk1 = ? AND ...` for a persisted record.
fn pk_condition(table: &Table, record: &Record) -> Result<Conditions> {
    let values = record.pk_values().ok_or_else(|| {
        Error::Custom(format!(
            "Cannot identify a {} row without a primary key value",
            table.class_name()
        ))
    })?;
    let columns: Vec<String> = table
        .pk()
        .iter()
        .map(|pk| table.column_for(pk).map_or_else(|| pk.clone(), |c| c.name.clone()))
        .collect();
    Ok(Conditions::from_keys(table.dialect(), None, &columns, &values))
}

/// Dates travel in the dialect's literal format.
fn to_wire(conn: &Adapter, value: Value) -> Value {
    match value {
        Value::DateTime(dt) => Value::Text(conn.datetime_to_string(&dt)),
        Value::Date(d) => Value::Text(conn.date_to_string(&d)),
        other => other,
    }
}

fn unknown_association(table: &Table, name: &str) -> Error {
    Error::Association(AssociationError {
        kind: AssociationErrorKind::UnknownAssociation,
        model: table.class_name().to_string(),
        message: format!("Relationship named {name} has not been declared for class: {}", table.class_name()),
    })
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
