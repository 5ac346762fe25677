//! Relationships: key inference, association SQL and loading.
//!
//! One variant per association shape. Every variant answers the same four
//! questions (`load`, `load_eagerly`, `build_association`,
//! `create_association`) by building finder options against the target
//! table and running them through the session.

use crate::eager::{self, BatchPlan, Partition};
use crate::model::{AssociationDecl, AssociationKind, RelationshipOptions};
use crate::record::{AttributeAssignment, Loaded, OWNER_KEY_COLUMN, Record};
use crate::session::Session;
use crate::table::Table;
use sqlrecord_core::{AssociationError, AssociationErrorKind, Error, Inflector, Result, Value};
use sqlrecord_query::{Conditions, FindMode, FindOptions, IncludePath, Join};
use std::sync::{Arc, OnceLock};

/// Resolved key columns of an association.
///
/// For has-many/has-one, `foreign_key` lives on the target and
/// `primary_key` on the owner; for belongs-to it is the other way round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keys {
    pub foreign_key: Vec<String>,
    pub primary_key: Vec<String>,
}

/// Declaration data shared by every shape.
#[derive(Debug)]
pub struct Association {
    name: String,
    owner_class: String,
    class_name: String,
    options: RelationshipOptions,
}

impl Association {
    fn new(owner_class: &str, decl: &AssociationDecl, inflector: &dyn Inflector) -> Self {
        let options = decl.options.clone();
        let class_name = match (&options.through, &options.source, &options.class_name) {
            (Some(_), Some(source), _) => inflector.classify(source),
            (_, _, Some(class_name)) => class_name.clone(),
            _ => inflector.classify(&decl.name),
        };
        Self {
            name: decl.name.clone(),
            owner_class: owner_class.to_string(),
            class_name,
            options,
        }
    }

    /// Finder options carried by the declaration.
    ///
    /// `limit`/`offset` are only included for a direct load; batched loads
    /// apply them per owner.
    fn finder_options(&self, paginate: bool) -> FindOptions {
        let o = &self.options;
        FindOptions {
            conditions: o.conditions.clone(),
            select: o.select.clone(),
            joins: o.joins.clone(),
            order: o.order.clone(),
            group: o.group.clone(),
            having: o.having.clone(),
            limit: o.limit.filter(|_| paginate),
            offset: o.offset.filter(|_| paginate),
            readonly: o.readonly,
            ..FindOptions::default()
        }
    }

    fn unsupported(&self, message: impl Into<String>) -> Error {
        Error::Association(AssociationError {
            kind: AssociationErrorKind::Unsupported,
            model: self.owner_class.clone(),
            message: message.into(),
        })
    }
}

/// The join and owner link of a resolved through association.
#[derive(Debug, Clone)]
pub struct ThroughJoin {
    /// Joins the final target to the bridge table.
    pub join: Join,
    /// Bridge table holding the owner link.
    pub bridge_table: String,
    /// Bridge columns matched against `owner_columns`.
    pub bridge_columns: Vec<String>,
    /// Owner attributes supplying the link values.
    pub owner_columns: Vec<String>,
}

/// `has_many` / `has_one`, optionally through another association.
#[derive(Debug)]
pub struct HasMany {
    base: Association,
    through: Option<String>,
    /// Set once the through bridge resolves; a failed resolution leaves it
    /// empty so the next load retries.
    resolved: OnceLock<ThroughJoin>,
}

#[derive(Debug)]
pub struct BelongsTo {
    base: Association,
}

#[derive(Debug)]
pub struct HasAndBelongsToMany {
    base: Association,
}

/// An association of a table descriptor, dispatched by shape.
#[derive(Debug)]
pub enum Relationship {
    HasMany(HasMany),
    HasOne(HasMany),
    BelongsTo(BelongsTo),
    HasAndBelongsToMany(HasAndBelongsToMany),
}

impl Relationship {
    pub fn new(owner_class: &str, decl: &AssociationDecl, inflector: &dyn Inflector) -> Self {
        let base = Association::new(owner_class, decl, inflector);
        let has_many = |base: Association| HasMany {
            through: base.options.through.clone(),
            base,
            resolved: OnceLock::new(),
        };
        match decl.kind {
            AssociationKind::HasMany => Relationship::HasMany(has_many(base)),
            AssociationKind::HasOne => Relationship::HasOne(has_many(base)),
            AssociationKind::BelongsTo => Relationship::BelongsTo(BelongsTo { base }),
            AssociationKind::HasAndBelongsToMany => {
                Relationship::HasAndBelongsToMany(HasAndBelongsToMany { base })
            }
        }
    }

    fn base(&self) -> &Association {
        match self {
            Relationship::HasMany(r) | Relationship::HasOne(r) => &r.base,
            Relationship::BelongsTo(r) => &r.base,
            Relationship::HasAndBelongsToMany(r) => &r.base,
        }
    }

    pub fn kind(&self) -> AssociationKind {
        match self {
            Relationship::HasMany(_) => AssociationKind::HasMany,
            Relationship::HasOne(_) => AssociationKind::HasOne,
            Relationship::BelongsTo(_) => AssociationKind::BelongsTo,
            Relationship::HasAndBelongsToMany(_) => AssociationKind::HasAndBelongsToMany,
        }
    }

    /// Association name, the attribute it is loaded under.
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Class of the records the association returns.
    pub fn class_name(&self) -> &str {
        &self.base().class_name
    }

    pub fn options(&self) -> &RelationshipOptions {
        &self.base().options
    }

    pub fn is_many(&self) -> bool {
        matches!(
            self,
            Relationship::HasMany(_) | Relationship::HasAndBelongsToMany(_)
        )
    }

    /// Name of the bridge association, for through associations.
    pub fn through(&self) -> Option<&str> {
        match self {
            Relationship::HasMany(r) | Relationship::HasOne(r) => r.through.as_deref(),
            _ => None,
        }
    }

    /// Whether a through association has resolved its bridge.
    pub fn is_initialized(&self) -> bool {
        match self {
            Relationship::HasMany(r) | Relationship::HasOne(r) => {
                r.through.is_none() || r.resolved.get().is_some()
            }
            _ => true,
        }
    }

    /// Resolve the key columns against `owner_table`.
    ///
    /// Declared keys win unless `override_declared` is set. For
    /// has-many/has-one the foreign key defaults to `keyify(owner class)` and
    /// the primary key to the owner's; for belongs-to the foreign key
    /// defaults to `keyify(target class)` and the primary key to the target's.
    /// Many-to-many returns the owner side: the join-table column referencing
    /// the owner, and the owner's primary key.
    pub fn infer_keys(
        &self,
        session: &Session,
        owner_table: &Table,
        override_declared: bool,
    ) -> Result<Keys> {
        let options = self.options();
        match self {
            Relationship::HasMany(_) | Relationship::HasOne(_) | Relationship::HasAndBelongsToMany(_) => {
                Ok(owner_side_keys(owner_table, options, override_declared))
            }
            Relationship::BelongsTo(_) => {
                let foreign_key = declared(&options.foreign_key, override_declared)
                    .unwrap_or_else(|| vec![owner_table.inflector().keyify(self.class_name())]);
                let primary_key = match declared(&options.primary_key, override_declared) {
                    Some(pk) => pk,
                    None => session.table(self.class_name())?.pk().to_vec(),
                };
                Ok(Keys {
                    foreign_key,
                    primary_key,
                })
            }
        }
    }

    /// Load the association for one owner.
    ///
    /// `Ok(None)` means the owner lacks a key value (an unsaved owner has no
    /// dependents); no query is issued in that case.
    #[tracing::instrument(level = "debug", skip(self, session, owner), fields(association = %self.name(), owner = %owner.class_name()))]
    pub fn load(&self, session: &Session, owner: &Record) -> Result<Option<Loaded>> {
        let owner_table = owner.table();
        let target = session.table(self.class_name())?;
        let dialect = target.dialect();
        let mut options = self.base().finder_options(true);

        let mode = match self {
            Relationship::HasMany(r) | Relationship::HasOne(r) => {
                if r.through.is_some() {
                    let through = r.resolve_through(session, owner_table, &target)?;
                    let Some(values) = owner.key_values(&through.owner_columns) else {
                        return Ok(None);
                    };
                    options = options.join(through.join).and_where(Conditions::from_keys(
                        dialect,
                        Some(&through.bridge_table),
                        &through.bridge_columns,
                        &values,
                    ));
                } else {
                    let keys = self.infer_keys(session, owner_table, false)?;
                    let Some(values) = owner.key_values(&keys.primary_key) else {
                        return Ok(None);
                    };
                    options = options.and_where(Conditions::from_keys(
                        dialect,
                        Some(target.name()),
                        &keys.foreign_key,
                        &values,
                    ));
                }
                if matches!(self, Relationship::HasOne(_)) {
                    FindMode::First
                } else {
                    FindMode::All
                }
            }
            Relationship::BelongsTo(_) => {
                let keys = self.infer_keys(session, owner_table, false)?;
                let Some(values) = owner.key_values(&keys.foreign_key) else {
                    return Ok(None);
                };
                options = options.and_where(Conditions::from_keys(
                    dialect,
                    Some(target.name()),
                    &keys.primary_key,
                    &values,
                ));
                FindMode::First
            }
            Relationship::HasAndBelongsToMany(r) => {
                let link = r.link(owner_table, &target)?;
                let Some(values) = owner.key_values(&link.owner_pk) else {
                    return Ok(None);
                };
                options = options.join(link.join).and_where(Conditions::from_keys(
                    dialect,
                    Some(&link.join_table),
                    &link.owner_fk,
                    &values,
                ));
                FindMode::All
            }
        };

        let records = session.find_in(&target, &options, mode, &[])?;
        Ok(Some(match mode {
            FindMode::First => Loaded::one(records.into_iter().next()),
            FindMode::All => Loaded::Many(records),
        }))
    }

    /// Load the association for many owners with a single query and attach
    /// each owner's share under the association name.
    #[tracing::instrument(level = "debug", skip(self, session, owner_table, includes, owners), fields(association = %self.name(), owners = owners.len()))]
    pub fn load_eagerly(
        &self,
        session: &Session,
        owner_table: &Table,
        includes: &[IncludePath],
        owners: &mut [Record],
    ) -> Result<()> {
        let target = session.table(self.class_name())?;
        let dialect = target.dialect();
        let mut options = self.base().finder_options(false);
        options.include = includes.to_vec();

        let plan = match self {
            Relationship::HasMany(r) | Relationship::HasOne(r) => {
                if r.through.is_some() {
                    let through = r.resolve_through(session, owner_table, &target)?;
                    let column = owner_column(&through.bridge_columns)?;
                    let in_column = dialect.quote_qualified(&through.bridge_table, column);
                    BatchPlan {
                        owner_key: owner_column(&through.owner_columns)?.to_string(),
                        extra_column: Some(format!("{in_column} AS {OWNER_KEY_COLUMN}")),
                        in_column,
                        partition: Partition::OwnerKeyColumn,
                        options: options.join(through.join),
                    }
                } else {
                    let keys = self.infer_keys(session, owner_table, false)?;
                    let fk = owner_column(&keys.foreign_key)?;
                    BatchPlan {
                        owner_key: owner_column(&keys.primary_key)?.to_string(),
                        in_column: dialect.quote_qualified(target.name(), fk),
                        extra_column: None,
                        partition: Partition::Attribute(fk.to_string()),
                        options,
                    }
                }
            }
            Relationship::BelongsTo(_) => {
                let keys = self.infer_keys(session, owner_table, false)?;
                let pk = owner_column(&keys.primary_key)?;
                BatchPlan {
                    owner_key: owner_column(&keys.foreign_key)?.to_string(),
                    in_column: dialect.quote_qualified(target.name(), pk),
                    extra_column: None,
                    partition: Partition::Attribute(pk.to_string()),
                    options,
                }
            }
            Relationship::HasAndBelongsToMany(r) => {
                let link = r.link(owner_table, &target)?;
                let in_column =
                    dialect.quote_qualified(&link.join_table, owner_column(&link.owner_fk)?);
                BatchPlan {
                    owner_key: owner_column(&link.owner_pk)?.to_string(),
                    extra_column: Some(format!("{in_column} AS {OWNER_KEY_COLUMN}")),
                    in_column,
                    partition: Partition::OwnerKeyColumn,
                    options: options.join(link.join),
                }
            }
        };

        eager::load_batched(session, &target, self, plan, owners)
    }

    /// A new, unsaved target record for `owner`.
    ///
    /// Has-many/has-one inject the foreign key unguarded first. With
    /// `guard` the caller's attributes then go through guarded
    /// mass-assignment and can never replace that key; without it they are
    /// assigned unguarded over it.
    pub fn build_association(
        &self,
        session: &Session,
        owner: &Record,
        attributes: &[(&str, Value)],
        guard: bool,
    ) -> Result<Record> {
        let target = session.table(self.class_name())?;
        let mut record = Record::new(Arc::clone(&target));

        let injected = match self {
            Relationship::HasMany(r) | Relationship::HasOne(r) => {
                if r.through.is_some() {
                    return Err(self.base().unsupported(format!(
                        "Cannot build through association '{}'",
                        self.name()
                    )));
                }
                let keys = self.infer_keys(session, owner.table(), false)?;
                for (fk, pk) in keys.foreign_key.iter().zip(&keys.primary_key) {
                    let value = owner.get(pk).cloned().unwrap_or(Value::Null);
                    record.assign_attribute(fk, value)?;
                }
                keys.foreign_key
            }
            Relationship::BelongsTo(_) | Relationship::HasAndBelongsToMany(_) => Vec::new(),
        };

        if guard {
            let inflector = target.inflector();
            let injected: Vec<String> = injected.iter().map(|k| inflector.variablize(k)).collect();
            let allowed: Vec<(&str, Value)> = attributes
                .iter()
                .filter(|(name, _)| !injected.contains(&inflector.variablize(name)))
                .cloned()
                .collect();
            record.set_attributes(&allowed)?;
        } else {
            for (name, value) in attributes {
                record.assign_attribute(name, value.clone())?;
            }
        }
        Ok(record)
    }

    /// Build the target and persist it; many-to-many also writes the join row.
    pub fn create_association(
        &self,
        session: &Session,
        owner: &Record,
        attributes: &[(&str, Value)],
        guard: bool,
    ) -> Result<Record> {
        let mut record = self.build_association(session, owner, attributes, guard)?;
        session.save(&mut record)?;

        if let Relationship::HasAndBelongsToMany(r) = self {
            let target = Arc::clone(record.table());
            let link = r.link(owner.table(), &target)?;
            let owner_values = owner.key_values(&link.owner_pk).ok_or_else(|| {
                r.base.unsupported("Cannot link a record to an owner without a primary key")
            })?;
            let target_values = record.pk_values().ok_or_else(|| {
                r.base.unsupported("Saved record has no primary key to link")
            })?;

            let dialect = target.dialect();
            let sql = format!(
                "INSERT INTO {}({},{}) VALUES(?,?)",
                dialect.quote_identifier(&link.join_table),
                dialect.quote_identifier(owner_column(&link.owner_fk)?),
                dialect.quote_identifier(&link.target_fk),
            );
            let params = [owner_values[0].clone(), target_values[0].clone()];
            session.execute_in(&target, &sql, &params)?;
        }
        Ok(record)
    }
}

fn declared(keys: &[String], override_declared: bool) -> Option<Vec<String>> {
    (!override_declared && !keys.is_empty()).then(|| keys.to_vec())
}

/// Keys of an association whose foreign key references the owner.
fn owner_side_keys(owner_table: &Table, options: &RelationshipOptions, override_declared: bool) -> Keys {
    Keys {
        foreign_key: declared(&options.foreign_key, override_declared)
            .unwrap_or_else(|| vec![owner_table.inflector().keyify(owner_table.class_name())]),
        primary_key: declared(&options.primary_key, override_declared)
            .unwrap_or_else(|| owner_table.pk().to_vec()),
    }
}

fn owner_column(columns: &[String]) -> Result<&str> {
    columns
        .first()
        .map(String::as_str)
        .ok_or_else(|| Error::Custom("Association has no key columns".to_string()))
}

impl HasMany {
    /// Resolve the bridge of a through association.
    ///
    /// The bridge is the owner's association named by `through`; it must be
    /// has-many, has-one or belongs-to. The target joins the bridge table on
    /// whichever side carries the key: `bridge.keyify(target) = target.pk`
    /// when the bridge rows point at the target, otherwise
    /// `target.keyify(bridge) = bridge.pk`. The result is cached only once
    /// resolution succeeds.
    fn resolve_through(
        &self,
        session: &Session,
        owner_table: &Table,
        target: &Table,
    ) -> Result<ThroughJoin> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved.clone());
        }
        let Some(through) = self.through.as_deref() else {
            return Err(self.base.unsupported("Association is not a through association"));
        };
        let invalid = |message: String| Error::invalid_through(owner_table.class_name(), message);

        let bridge = owner_table.relationship(through).ok_or_else(|| {
            invalid(format!(
                "Could not find the association {through} in model {}",
                owner_table.class_name()
            ))
        })?;

        let (bridge_columns, owner_columns) = match bridge {
            Relationship::HasMany(b) | Relationship::HasOne(b) if b.through.is_none() => {
                let keys = bridge.infer_keys(session, owner_table, false)?;
                (keys.foreign_key, keys.primary_key)
            }
            Relationship::BelongsTo(_) => {
                let keys = bridge.infer_keys(session, owner_table, false)?;
                (keys.primary_key, keys.foreign_key)
            }
            _ => {
                return Err(invalid(format!(
                    "{} through {through}: the bridge must be a direct has_many, has_one or belongs_to association",
                    self.base.name
                )));
            }
        };

        let bridge_table = session.table(bridge.class_name())?;
        let dialect = target.dialect();
        let inflector = target.inflector();

        // Re-point the keys at the target to find the join columns.
        let target_key = inflector.keyify(target.class_name());
        let bridge_key = inflector.keyify(bridge_table.class_name());
        let join = match (target.pk().first(), bridge_table.pk().first()) {
            (Some(target_pk), _) if bridge_table.column_for(&target_key).is_some() => {
                Join::on_columns(dialect, bridge_table.name(), &target_key, target.name(), target_pk)
            }
            (_, Some(bridge_pk)) if target.column_for(&bridge_key).is_some() => {
                Join::on_columns(dialect, bridge_table.name(), bridge_pk, target.name(), &bridge_key)
            }
            _ => {
                return Err(invalid(format!(
                    "No key links {} to {}: expected {}.{target_key} or {}.{bridge_key}",
                    target.name(),
                    bridge_table.name(),
                    bridge_table.name(),
                    target.name()
                )));
            }
        };

        let resolved = ThroughJoin {
            join,
            bridge_table: bridge_table.name().to_string(),
            bridge_columns,
            owner_columns,
        };
        tracing::debug!(
            association = %self.base.name,
            through = %through,
            bridge_table = %resolved.bridge_table,
            "Through association resolved"
        );
        let _ = self.resolved.set(resolved.clone());
        Ok(resolved)
    }
}

/// Join-table columns of a many-to-many association.
struct JoinTableLink {
    join_table: String,
    join: Join,
    owner_fk: Vec<String>,
    owner_pk: Vec<String>,
    target_fk: String,
}

impl HasAndBelongsToMany {
    fn link(&self, owner_table: &Table, target: &Table) -> Result<JoinTableLink> {
        let options = &self.base.options;
        let inflector = owner_table.inflector();
        let join_table = options.join_table.clone().unwrap_or_else(|| {
            let mut names = [owner_table.name(), target.name()];
            names.sort_unstable();
            names.join("_")
        });
        let keys = owner_side_keys(owner_table, options, false);
        let target_fk = options
            .association_foreign_key
            .clone()
            .unwrap_or_else(|| inflector.keyify(target.class_name()));
        let target_pk = owner_column(target.pk())?;
        let join = Join::on_columns(target.dialect(), &join_table, &target_fk, target.name(), target_pk);
        Ok(JoinTableLink {
            join_table,
            join,
            owner_fk: keys.foreign_key,
            owner_pk: keys.primary_key,
            target_fk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelClass;
    use crate::testing;

    fn ids(loaded: &Loaded) -> Vec<i64> {
        loaded
            .as_many()
            .iter()
            .map(|r| r.get_as::<i64>("id").expect("id"))
            .collect()
    }

    #[test]
    fn test_class_name_inference() {
        let (session, _) = testing::session();
        let school = session.table("School").expect("table");
        assert_eq!(school.relationship("people").expect("people").class_name(), "Person");
        assert_eq!(school.relationship("principal").expect("principal").class_name(), "Principal");

        let person = session.table("Person").expect("table");
        assert_eq!(person.relationship("schoolmates").expect("rel").class_name(), "Person");
        assert_eq!(person.relationship("tags").expect("rel").class_name(), "Tag");
        assert_eq!(person.relationship("ghosts").expect("rel").class_name(), "Person");
    }

    #[test]
    fn test_infer_keys() {
        let (session, _) = testing::session();
        let school = session.table("School").expect("table");
        let people = school.relationship("people").expect("people");
        assert_eq!(
            people.infer_keys(&session, &school, false).expect("keys"),
            Keys {
                foreign_key: vec!["school_id".to_string()],
                primary_key: vec!["id".to_string()],
            }
        );

        let person = session.table("Person").expect("table");
        let belongs = person.relationship("school").expect("school");
        assert_eq!(
            belongs.infer_keys(&session, &person, false).expect("keys"),
            Keys {
                foreign_key: vec!["school_id".to_string()],
                primary_key: vec!["id".to_string()],
            }
        );
    }

    #[test]
    fn test_declared_keys_win_unless_overridden() {
        let (session, _) = testing::session();
        session.register(
            ModelClass::new("School")
                .has_many("pupils", RelationshipOptions::new().class_name("Person").foreign_key("school_ref")),
        );
        let school = session.table("School").expect("table");
        let pupils = school.relationship("pupils").expect("pupils");
        assert_eq!(
            pupils.infer_keys(&session, &school, false).expect("keys").foreign_key,
            vec!["school_ref"]
        );
        assert_eq!(
            pupils.infer_keys(&session, &school, true).expect("keys").foreign_key,
            vec!["school_id"]
        );
    }

    #[test]
    fn test_has_many_load() {
        let (session, statements) = testing::session();
        let school = session
            .find_by_pk("School", &[Value::Int(1)])
            .expect("find")
            .expect("school");
        testing::take_selects(&statements);

        let people = session.load_association(&school, "people").expect("load").expect("loaded");
        assert_eq!(ids(&people), vec![1, 2]);
        assert_eq!(
            testing::take_selects(&statements),
            vec!["SELECT * FROM \"people\" WHERE \"people\".\"school_id\" = ? ORDER BY id"]
        );
    }

    #[test]
    fn test_has_one_load() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(1)]).expect("find").expect("school");
        let principal = session.load_association(&school, "principal").expect("load").expect("loaded");
        let principal = principal.as_one().expect("principal");
        assert_eq!(principal.get_as::<String>("name").expect("name"), "Skinner");

        let school = session.find_by_pk("School", &[Value::Int(2)]).expect("find").expect("school");
        let principal = session.load_association(&school, "principal").expect("load").expect("loaded");
        assert!(principal.as_one().is_none());
    }

    #[test]
    fn test_belongs_to_load() {
        let (session, _) = testing::session();
        let nelson = session.find_by_pk("Person", &[Value::Int(3)]).expect("find").expect("person");
        let school = session.load_association(&nelson, "school").expect("load").expect("loaded");
        assert_eq!(
            school.as_one().expect("school").get_as::<String>("name").expect("name"),
            "Shelbyville High"
        );
    }

    #[test]
    fn test_missing_owner_key_returns_none_without_a_query() {
        let (session, statements) = testing::session();
        let maggie = session.find_by_pk("Person", &[Value::Int(4)]).expect("find").expect("person");
        let unsaved = session.new_record("School").expect("record");
        testing::take_selects(&statements);

        assert!(session.load_association(&maggie, "school").expect("load").is_none());
        assert!(session.load_association(&unsaved, "people").expect("load").is_none());
        assert!(testing::take_selects(&statements).is_empty());
    }

    #[test]
    fn test_through_has_many_bridge() {
        let (session, statements) = testing::session();
        let order = session.find_by_pk("Order", &[Value::Int(1)]).expect("find").expect("order");
        testing::take_selects(&statements);

        let people = session.load_association(&order, "people").expect("load").expect("loaded");
        assert_eq!(ids(&people), vec![1, 2]);
        assert_eq!(
            testing::take_selects(&statements),
            vec![
                "SELECT \"people\".* FROM \"people\" \
                 INNER JOIN \"payments\" ON(\"people\".\"id\" = \"payments\".\"person_id\") \
                 WHERE \"payments\".\"order_id\" = ?"
            ]
        );
    }

    #[test]
    fn test_through_target_carries_bridge_key() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(1)]).expect("find").expect("school");
        let payments = session.load_association(&school, "payments").expect("load").expect("loaded");
        let mut found = ids(&payments);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2, 4]);
    }

    #[test]
    fn test_through_belongs_to_bridge() {
        let (session, _) = testing::session();
        let bart = session.find_by_pk("Person", &[Value::Int(1)]).expect("find").expect("person");
        let mates = session.load_association(&bart, "schoolmates").expect("load").expect("loaded");
        let mut found = ids(&mates);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);

        let orders = session.load_association(&bart, "orders").expect("load").expect("loaded");
        let mut found = ids(&orders);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_invalid_through_is_retried() {
        let (session, _) = testing::session();
        let bart = session.find_by_pk("Person", &[Value::Int(1)]).expect("find").expect("person");

        let err = session.load_association(&bart, "ghosts").unwrap_err();
        assert!(err.is_invalid_through(), "{err}");
        let table = session.table("Person").expect("table");
        assert!(!table.relationship("ghosts").expect("rel").is_initialized());

        // Still failing, and still not cached as resolved.
        let err = session.load_association(&bart, "ghosts").unwrap_err();
        assert!(err.is_invalid_through());
        assert!(!table.relationship("ghosts").expect("rel").is_initialized());
    }

    #[test]
    fn test_invalid_through_on_unsaved_owner() {
        let (session, _) = testing::session();
        let unsaved = session.new_record("Person").expect("record");
        let err = session.load_association(&unsaved, "ghosts").unwrap_err();
        assert!(err.is_invalid_through());
    }

    #[test]
    fn test_through_on_many_to_many_bridge_is_invalid() {
        let (session, _) = testing::session();
        session.register(
            ModelClass::new("Person")
                .has_and_belongs_to_many("tags", RelationshipOptions::new())
                .has_many("tag_people", RelationshipOptions::new().through("tags").class_name("Person")),
        );
        let bart = session.find_by_pk("Person", &[Value::Int(1)]).expect("find").expect("person");
        let err = session.load_association(&bart, "tag_people").unwrap_err();
        assert!(err.is_invalid_through());
    }

    #[test]
    fn test_through_resolution_is_cached_on_success() {
        let (session, _) = testing::session();
        let order = session.find_by_pk("Order", &[Value::Int(2)]).expect("find").expect("order");
        let table = session.table("Order").expect("table");
        assert!(!table.relationship("people").expect("rel").is_initialized());
        session.load_association(&order, "people").expect("load");
        assert!(table.relationship("people").expect("rel").is_initialized());
    }

    #[test]
    fn test_habtm_load() {
        let (session, _) = testing::session();
        let bart = session.find_by_pk("Person", &[Value::Int(1)]).expect("find").expect("person");
        let tags = session.load_association(&bart, "tags").expect("load").expect("loaded");
        assert_eq!(ids(&tags), vec![2]);

        let tag = session.find_by_pk("Tag", &[Value::Int(2)]).expect("find").expect("tag");
        let people = session.load_association(&tag, "people").expect("load").expect("loaded");
        let mut found = ids(&people);
        found.sort_unstable();
        assert_eq!(found, vec![1, 3]);
    }

    #[test]
    fn test_relationship_options_shape_the_query() {
        let (session, statements) = testing::session();
        session.register(
            ModelClass::new("Order").has_many(
                "big_payments",
                RelationshipOptions::new()
                    .class_name("Payment")
                    .conditions("amount > ?", vec![Value::Double(2.0)])
                    .order("amount DESC")
                    .limit(1),
            ),
        );
        let order = session.find_by_pk("Order", &[Value::Int(1)]).expect("find").expect("order");
        testing::take_selects(&statements);

        let payments = session.load_association(&order, "big_payments").expect("load").expect("loaded");
        assert_eq!(ids(&payments), vec![2]);
        assert_eq!(
            testing::take_selects(&statements),
            vec![
                "SELECT * FROM \"payments\" WHERE (amount > ?) AND (\"payments\".\"order_id\" = ?) \
                 ORDER BY amount DESC LIMIT 1"
            ]
        );
    }

    #[test]
    fn test_build_association_injects_foreign_key() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(2)]).expect("find").expect("school");

        let person = session
            .build_association(&school, "people", &[("name", Value::from("Jimbo"))], true)
            .expect("build");
        assert!(person.is_new_record());
        assert_eq!(person.get("school_id"), Some(&Value::Int(2)));
        assert_eq!(person.get_as::<String>("name").expect("name"), "Jimbo");
    }

    #[test]
    fn test_guarded_build_cannot_override_foreign_key() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(2)]).expect("find").expect("school");
        let person = session
            .build_association(
                &school,
                "people",
                &[("name", Value::from("Kearney")), ("school_id", Value::Int(1))],
                true,
            )
            .expect("build");
        assert_eq!(person.get("school_id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_unguarded_build_lets_caller_attributes_win() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(2)]).expect("find").expect("school");
        let person = session
            .build_association(&school, "people", &[("school_id", Value::Int(1)), ("id", Value::Int(50))], false)
            .expect("build");
        assert_eq!(person.get("school_id"), Some(&Value::Int(1)));
        assert_eq!(person.get("id"), Some(&Value::Int(50)));
    }

    #[test]
    fn test_build_through_association_is_unsupported() {
        let (session, _) = testing::session();
        let order = session.find_by_pk("Order", &[Value::Int(1)]).expect("find").expect("order");
        let err = session.build_association(&order, "people", &[], true).unwrap_err();
        assert!(matches!(
            err,
            Error::Association(AssociationError { kind: AssociationErrorKind::Unsupported, .. })
        ));
    }

    #[test]
    fn test_create_association_persists() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(2)]).expect("find").expect("school");
        let person = session
            .create_association(&school, "people", &[("name", Value::from("Dolph"))], true)
            .expect("create");
        assert!(!person.is_new_record());
        let id = person.get_as::<i64>("id").expect("id");
        assert!(id > 4);

        let reloaded = session.find_by_pk("Person", &[Value::Int(id)]).expect("find").expect("person");
        assert_eq!(reloaded.get("school_id"), Some(&Value::Int(2)));
        assert_eq!(reloaded.get_as::<String>("name").expect("name"), "Dolph");
    }

    #[test]
    fn test_create_association_surfaces_persistence_errors() {
        let (session, _) = testing::session();
        let school = session.find_by_pk("School", &[Value::Int(2)]).expect("find").expect("school");
        {
            let adapter = session.registry().resolve(None).expect("adapter");
            crate::session::lock(&adapter)
                .execute("DROP TABLE people", &[])
                .expect("drop");
        }
        let err = session
            .create_association(&school, "people", &[("name", Value::from("Dolph"))], true)
            .unwrap_err();
        assert!(err.is_query_failed(), "{err}");
    }

    #[test]
    fn test_belongs_to_create_saves_target_only() {
        let (session, _) = testing::session();
        let maggie = session.find_by_pk("Person", &[Value::Int(4)]).expect("find").expect("person");
        let school = session
            .create_association(&maggie, "school", &[("name", Value::from("Ms. Sinclair's"))], true)
            .expect("create");
        assert!(!school.is_new_record());
        assert_eq!(school.get_as::<i64>("id").expect("id"), 3);

        let maggie = session.find_by_pk("Person", &[Value::Int(4)]).expect("find").expect("person");
        assert_eq!(maggie.get("school_id"), Some(&Value::Null));
    }

    #[test]
    fn test_habtm_create_writes_join_row() {
        let (session, _) = testing::session();
        let lisa = session.find_by_pk("Person", &[Value::Int(2)]).expect("find").expect("person");
        let tag = session
            .create_association(&lisa, "tags", &[("name", Value::from("vegetarian"))], true)
            .expect("create");
        let tag_id = tag.get_as::<i64>("id").expect("id");

        let tags = session.load_association(&lisa, "tags").expect("load").expect("loaded");
        let mut found = ids(&tags);
        found.sort_unstable();
        assert_eq!(found, vec![1, tag_id]);
    }
}
