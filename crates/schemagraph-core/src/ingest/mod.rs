//! Catalog ingest.
//!
//! A graph is built from three ordered batches of flat rows: tables and
//! columns, then indexes, then constraints. Constraints come last so every
//! table a foreign key references already exists when it is resolved.

mod builder;
mod parse;
mod rows;
mod source;

pub use builder::CatalogIngest;
pub use parse::{
    column_type, default_value, parse_enum_labels, parse_type_descriptor, strip_default_cast,
    TypeDescriptor,
};
pub use rows::{ColumnRow, ConstraintRow, IndexRow};
pub use source::{ingest, CatalogRows, CatalogSource};
