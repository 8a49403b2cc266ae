//! Relation definitions inferred between tables.

use crate::graph::{ConstraintId, TableId};

/// Cardinality of a relation, seen from its source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// The source is referenced by many rows of the target (`hasMany`).
    OneToMany,
    /// Many source rows reference one target row (`belongsTo`).
    ManyToOne,
    /// Source and target are connected through a join table (`belongsToMany`).
    ManyToMany,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::OneToMany => write!(f, "one-to-many"),
            Cardinality::ManyToOne => write!(f, "many-to-one"),
            Cardinality::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// A relation derived from foreign-key topology.
///
/// Relations are never stored in the graph; they are produced on demand and held
/// only in the graph's derived caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Table the relation belongs to.
    pub source: TableId,
    /// Table on the other end.
    pub target: TableId,
    /// Join table for many-to-many relations.
    pub join_table: Option<TableId>,
    /// Foreign key behind the relation; for many-to-many the join table's key
    /// pointing at the source.
    pub constraint: ConstraintId,
    /// For many-to-many, the join table's key pointing at the target.
    pub target_constraint: Option<ConstraintId>,
}

impl Relation {
    /// `source >--- target` through `constraint` owned by `source`.
    pub fn many_to_one(source: TableId, target: TableId, constraint: ConstraintId) -> Self {
        Self {
            cardinality: Cardinality::ManyToOne,
            source,
            target,
            join_table: None,
            constraint,
            target_constraint: None,
        }
    }

    /// `source ---< target` through `constraint` owned by `target`.
    pub fn one_to_many(source: TableId, target: TableId, constraint: ConstraintId) -> Self {
        Self {
            cardinality: Cardinality::OneToMany,
            source,
            target,
            join_table: None,
            constraint,
            target_constraint: None,
        }
    }

    /// `source ---< join >--- target`.
    pub fn many_to_many(
        source: TableId,
        join_table: TableId,
        target: TableId,
        source_constraint: ConstraintId,
        target_constraint: ConstraintId,
    ) -> Self {
        Self {
            cardinality: Cardinality::ManyToMany,
            source,
            target,
            join_table: Some(join_table),
            constraint: source_constraint,
            target_constraint: Some(target_constraint),
        }
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }

    /// The same relation seen from the target table.
    ///
    /// One-to-many and many-to-one swap; many-to-many swaps its constraints.
    pub fn inverse(&self) -> Self {
        match self.cardinality {
            Cardinality::ManyToOne => Self::one_to_many(self.target, self.source, self.constraint),
            Cardinality::OneToMany => Self::many_to_one(self.target, self.source, self.constraint),
            Cardinality::ManyToMany => Self {
                source: self.target,
                target: self.source,
                constraint: self.target_constraint.unwrap_or(self.constraint),
                target_constraint: Some(self.constraint),
                ..*self
            },
        }
    }
}

/// A relation together with its generated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRelation {
    /// The relation.
    pub relation: Relation,
    /// Generated name.
    pub name: String,
}
