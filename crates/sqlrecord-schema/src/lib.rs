//! Schema introspection for SQLRecord.
//!
//! This crate provides the per-dialect statements behind `Adapter::columns`
//! and `Adapter::tables`, and the mapping of the rows they return into the
//! column catalog.

pub mod introspect;

pub use introspect::{ColumnDescription, IntrospectionQuery, Introspector};
