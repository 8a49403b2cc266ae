//! The catalog entity graph.
//!
//! A [`Database`] owns schemas, schemas own tables, tables own columns,
//! constraints and indexes. Everything is stored in arenas on the database and
//! linked by typed identifiers.

mod database;
pub(crate) mod derived;
mod entity;
mod ids;
mod lookup;

pub use database::Database;
pub use entity::{
    Column, ColumnType, Constraint, ConstraintKind, DefaultValue, ForeignKeyTarget, Index,
    NewColumn, NewConstraint, NewIndex, NewTable, QualifiedName, ReferentialAction, Schema,
    Table, TableKind, TableVersions,
};
pub use ids::{ColumnId, ConstraintId, IndexId, SchemaId, TableId};
pub use lookup::EntityRef;
