//! Models, records and relationships for SQLRecord.
//!
//! `sqlrecord-session` is the **relationship layer**. It turns declared
//! associations into SQL, loads them one owner at a time or batched across
//! many owners, and persists records.
//!
//! # Role In The Architecture
//!
//! - **Model classes**: [`ModelClass`] declares table, keys, guard lists and
//!   associations.
//! - **Table descriptors**: [`Table`] caches the column catalog, primary key
//!   and [`Relationship`]s of a class; built once per session.
//! - **Records**: [`Record`] is a dynamic attribute bag with guarded
//!   mass-assignment ([`AttributeAssignment`]) and dirty tracking.
//! - **Eager loading**: one `IN` query per included association, partitioned
//!   back onto the owners.
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(registry)
//!     .with_model(ModelClass::new("School").has_many("people", RelationshipOptions::new()))
//!     .with_model(ModelClass::new("Person").belongs_to("school", RelationshipOptions::new()));
//!
//! let schools = session.find_all("School", &FindOptions::new().include(&["people"]))?;
//! for school in &schools {
//!     let people = school.association("people").map_or(0, Loaded::len);
//! }
//! ```

mod eager;
pub mod model;
pub mod record;
pub mod relationship;
pub mod session;
pub mod table;

#[cfg(test)]
mod testing;

pub use model::{AssociationDecl, AssociationKind, ModelClass, RelationshipOptions};
pub use record::{AttributeAssignment, Loaded, Record};
pub use relationship::{Keys, Relationship, ThroughJoin};
pub use session::Session;
pub use table::Table;
