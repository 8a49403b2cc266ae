//! Relations inferred from foreign keys: one-to-many, many-to-one and
//! many-to-many through join tables, plus their naming.

pub(crate) mod infer;
mod model;
pub(crate) mod naming;

pub use model::{Cardinality, NamedRelation, Relation};
