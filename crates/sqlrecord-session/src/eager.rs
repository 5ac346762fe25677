//! Eager loading: one batched query per association, redistributed onto
//! the owners.

use crate::record::{Loaded, OWNER_KEY_COLUMN, Record};
use crate::relationship::Relationship;
use crate::session::Session;
use crate::table::Table;
use sqlrecord_core::{KeyValue, Result, Value};
use sqlrecord_query::{Conditions, FindMode, FindOptions};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How the rows of a batched query are matched back to owners.
#[derive(Debug, Clone)]
pub(crate) enum Partition {
    /// By an attribute of the loaded records (the foreign key for has-many,
    /// the primary key for belongs-to).
    Attribute(String),
    /// By the owner key selected under [`OWNER_KEY_COLUMN`] in a join query.
    OwnerKeyColumn,
}

/// A batched association query.
#[derive(Debug, Clone)]
pub(crate) struct BatchPlan {
    /// Owner attribute whose values fill the IN list.
    pub owner_key: String,
    /// Quoted, qualified column the IN list applies to.
    pub in_column: String,
    /// Additional select expression (the aliased owner key).
    pub extra_column: Option<String>,
    pub partition: Partition,
    pub options: FindOptions,
}

/// Run `plan` for `owners` and attach each owner's share.
///
/// Owners without a key value get an empty association and are left out
/// of the IN list; when no owner has one, no query is issued. The
/// relationship's `limit`/`offset` are applied per owner, and a to-one
/// association takes the first row of its share, so every owner ends up with
/// what a direct load would have returned.
pub(crate) fn load_batched(
    session: &Session,
    target: &Arc<Table>,
    relationship: &Relationship,
    plan: BatchPlan,
    owners: &mut [Record],
) -> Result<()> {
    let name = relationship.name();
    let mut seen = HashSet::new();
    let values: Vec<Value> = owners
        .iter()
        .filter_map(|owner| owner.get(&plan.owner_key))
        .filter(|value| value.key().is_some_and(|key| seen.insert(key)))
        .cloned()
        .collect();

    let mut partitions: HashMap<KeyValue, Vec<Record>> = HashMap::new();
    let mut rows = 0;
    if !values.is_empty() {
        let options = plan
            .options
            .and_where(Conditions::in_list(&plan.in_column, values));
        let extra: Vec<String> = plan.extra_column.into_iter().collect();
        let records = session.find_in(target, &options, FindMode::All, &extra)?;
        rows = records.len();

        for mut record in records {
            let key = match &plan.partition {
                Partition::Attribute(attribute) => record.get(attribute).and_then(Value::key),
                Partition::OwnerKeyColumn => record
                    .take_attribute(OWNER_KEY_COLUMN)
                    .and_then(|value| value.key()),
            };
            if let Some(key) = key {
                partitions.entry(key).or_default().push(record);
            }
        }
    }

    tracing::trace!(
        association = %name,
        owners = owners.len(),
        rows,
        partitions = partitions.len(),
        "Eager load partitioned"
    );

    let (offset, limit) = window(relationship.options().offset, relationship.options().limit);

    for owner in owners.iter_mut() {
        let share: Vec<Record> = owner
            .get(&plan.owner_key)
            .and_then(Value::key)
            .and_then(|key| partitions.get(&key))
            .map(|records| records.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default();

        let loaded = if relationship.is_many() {
            Loaded::Many(share)
        } else {
            Loaded::one(share.into_iter().next())
        };
        owner.set_association(name, loaded);
    }
    Ok(())
}

/// The per-owner slice a direct load would paginate to.
///
/// An offset without a limit pages to zero rows, as `Dialect::paginate`
/// coerces the missing limit to 0.
fn window(offset: Option<u64>, limit: Option<u64>) -> (usize, usize) {
    let to_usize = |n: u64| usize::try_from(n).unwrap_or(usize::MAX);
    let limit = match (offset, limit) {
        (_, Some(limit)) => to_usize(limit),
        (Some(_), None) => 0,
        (None, None) => usize::MAX,
    };
    (offset.map_or(0, to_usize), limit)
}
