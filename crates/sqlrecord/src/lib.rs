//! SQLRecord - active-record style associations and dialect adapters.
//!
//! SQLRecord maps rows of a relational database onto dynamic records and
//! loads their associations:
//!
//! - `has_many`, `has_one`, `belongs_to` and `has_and_belongs_to_many`
//!   associations, with `through` bridges
//! - Eager loading of whole association trees with one query per level
//! - Guarded mass-assignment of attributes
//! - Dialect-aware adapters (quoting, pagination, sequences, dates) for
//!   MySQL, PostgreSQL, SQLite and Oracle
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlrecord::prelude::*;
//!
//! let mut config = Config::new();
//! config.add_connection("development", "sqlite://school.db");
//!
//! let session = sqlrecord::connect(config)
//!     .with_model(ModelClass::new("School").has_many("people", RelationshipOptions::new()))
//!     .with_model(ModelClass::new("Person").belongs_to("school", RelationshipOptions::new()));
//!
//! // One query for the schools, one for all of their people.
//! let schools = session.find_all("School", &FindOptions::new().include(&["people"]))?;
//!
//! let school = &schools[0];
//! let person = session.create_association(school, "people", &[("name", Value::from("Bart"))], true)?;
//! ```
//!
//! # Crates
//!
//! - `sqlrecord-core`: values, rows, errors, configuration, dialects and inflection
//! - `sqlrecord-schema`: per-dialect column introspection
//! - `sqlrecord-connection`: the [`Adapter`] and the [`ConnectionRegistry`]
//! - `sqlrecord-query`: finder options and SELECT assembly
//! - `sqlrecord-session`: model classes, records, relationships and eager loading
//! - `sqlrecord-sqlite`: the bundled SQLite driver (feature `sqlite`)

pub use sqlrecord_core::{
    AssociationError, AssociationErrorKind, AttributeError, AttributeErrorKind, Column,
    ColumnType, Columns, Config, ConfigErrorKind, ConnectionInfo, Connector, Cursor, Date,
    DateClass, DateTime, Dialect, Driver, EnglishInflector, Error, FromValue, Inflector,
    KeyValue, Logger, Result, Row, TracingLogger, Value, Zone, DEFAULT_CONNECTION,
};

pub use sqlrecord_connection::{Adapter, ConnectionRegistry, RegistryStats, SharedAdapter};
pub use sqlrecord_query::{Conditions, FindMode, FindOptions, IncludePath, Join, JoinType, Select};
pub use sqlrecord_schema::Introspector;
pub use sqlrecord_session::{
    AssociationDecl, AssociationKind, AttributeAssignment, Keys, Loaded, ModelClass, Record,
    Relationship, RelationshipOptions, Session, Table, ThroughJoin,
};

#[cfg(feature = "sqlite")]
pub use sqlrecord_sqlite::{SqliteConfig, SqliteConnection, SqliteConnector};

/// A registry for `config` with every bundled driver registered.
pub fn registry(config: Config) -> ConnectionRegistry {
    let registry = ConnectionRegistry::new(config);
    #[cfg(feature = "sqlite")]
    let registry = registry.with_connector(std::sync::Arc::new(SqliteConnector::new()));
    registry
}

/// A session over [`registry`]`(config)`.
///
/// Connections open lazily, on the first query against them.
pub fn connect(config: Config) -> Session {
    let session = Session::new(registry(config));
    tracing::debug!(
        default_connection = %session.registry().config().default_connection(),
        "Session created"
    );
    session
}

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sqlrecord::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AttributeAssignment,
        Conditions,
        Config,
        Error,
        FindOptions,
        IncludePath,
        Loaded,
        ModelClass,
        Record,
        RelationshipOptions,
        Result,
        Session,
        Value,
    };
}
