//! Finder options and SQL assembly for SQLRecord.
//!
//! `sqlrecord-query` turns finder options into dialect-correct SQL. It is not
//! a query-builder DSL: conditions are SQL fragments with positional `?`
//! placeholders, and every dialect difference (quoting, pagination) is
//! delegated to [`sqlrecord_core::Dialect`].
//!
//! - [`FindOptions`]: `conditions`, `select`, `joins`, `order`, `group`,
//!   `having`, `limit`, `offset`, `include`, `readonly`
//! - [`Conditions`]: `col = ?` / `col IN(?,...)` fragments combined with AND
//! - [`Select`]: SELECT assembly, paginated only when asked to
//! - [`IncludePath`]: dotted include paths for eager loading
//! - [`Join`]: the `INNER JOIN t ON(a.x = t.y)` fragments associations use

pub mod clause;
pub mod include;
pub mod join;
pub mod options;
pub mod select;

pub use clause::Conditions;
pub use include::IncludePath;
pub use join::{Join, JoinType};
pub use options::FindOptions;
pub use select::{FindMode, Select};
