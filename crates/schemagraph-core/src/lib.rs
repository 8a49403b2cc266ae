//! schemagraph core - catalog graph, relation inference and snapshots.
//!
//! A [`Database`] is built from flat catalog rows by [`CatalogIngest`], frozen,
//! and then read through name-keyed accessors, dotted-path lookup and cached
//! relation views. Graphs can be saved to and restored from version-tagged
//! snapshots.

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod relation;
pub mod snapshot;

pub use cache::{CacheCounters, Version};
pub use config::{CacheMode, GraphConfig, NamingStrategy, SelfJoinPolicy};
pub use error::{EntityKind, Error, Result};
pub use graph::{
    Column, ColumnId, ColumnType, Constraint, ConstraintId, ConstraintKind, Database, DefaultValue,
    EntityRef, ForeignKeyTarget, Index, IndexId, NewColumn, NewConstraint, NewIndex, NewTable,
    QualifiedName, ReferentialAction, Schema, SchemaId, Table, TableId, TableKind, TableVersions,
};
pub use ingest::{CatalogIngest, CatalogRows, CatalogSource, ColumnRow, ConstraintRow, IndexRow};
pub use relation::{Cardinality, NamedRelation, Relation};
pub use snapshot::{deserialize, load, save, serialize, Encoding, FormatVersion};
