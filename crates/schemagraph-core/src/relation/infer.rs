//! Relation inference from foreign-key topology.
//!
//! All functions here are pure reads of the graph; the cached entry points live on
//! [`Database`].

use super::model::Relation;
use crate::config::SelfJoinPolicy;
use crate::graph::{ConstraintId, Database, TableId};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Many-to-many relations of every table, keyed by source table.
#[derive(Debug, Default)]
pub(crate) struct ManyToManyIndex {
    pub(crate) all: HashMap<TableId, Vec<Relation>>,
    pub(crate) primary_key_joined: HashMap<TableId, Vec<Relation>>,
}

/// One relation per foreign key owned by `table`.
pub(crate) fn many_to_one(db: &Database, table: TableId) -> Vec<Relation> {
    db.foreign_key_constraints(table)
        .iter()
        .filter_map(|&id| {
            let constraint = db.constraint(id);
            constraint
                .referenced_table
                .map(|target| Relation::many_to_one(table, target, id))
        })
        .collect()
}

/// One relation per foreign key anywhere in the graph that references `table`.
pub(crate) fn one_to_many(db: &Database, table: TableId) -> Vec<Relation> {
    db.foreign_key_constraints_to(table)
        .iter()
        .map(|&id| Relation::one_to_many(table, db.constraint(id).table, id))
        .collect()
}

/// Foreign keys grouped by the table they reference, in table then constraint
/// name order.
pub(crate) fn foreign_keys_by_target(db: &Database) -> HashMap<TableId, Vec<ConstraintId>> {
    let mut index: HashMap<TableId, Vec<ConstraintId>> = HashMap::new();
    for table in db.all_tables() {
        for constraint in db.constraints(table.id) {
            if let (true, Some(target)) = (constraint.is_foreign_key(), constraint.referenced_table)
            {
                index.entry(target).or_default().push(constraint.id);
            }
        }
    }
    index
}

/// Evaluate every table as a join table candidate.
///
/// A table qualifies when it owns two or more foreign keys to at least two
/// distinct other tables. Each unordered pair of its keys `(c1 -> A, c2 -> B)`
/// yields `A ---< T >--- B` on A and the mirror relation on B. Pairs whose key
/// columns both lie within the join table's primary key are also recorded as
/// primary-key-joined.
pub(crate) fn many_to_many_index(db: &Database) -> ManyToManyIndex {
    let policy = db.config().self_join;
    let mut index = ManyToManyIndex::default();

    for join in db.all_tables() {
        let legs: Vec<(ConstraintId, TableId)> = db
            .foreign_key_constraints(join.id)
            .iter()
            .filter_map(|&id| {
                db.constraint(id)
                    .referenced_table
                    .filter(|&target| target != join.id)
                    .map(|target| (id, target))
            })
            .collect();
        if legs.len() < 2 {
            continue;
        }
        let distinct: HashSet<TableId> = legs.iter().map(|(_, target)| *target).collect();
        if distinct.len() < 2 && policy == SelfJoinPolicy::Exclude {
            continue;
        }

        let primary_key: HashSet<_> = db.primary_key_columns(join.id).iter().copied().collect();
        let within_primary_key = |id: ConstraintId| {
            !primary_key.is_empty()
                && db
                    .constraint(id)
                    .columns
                    .iter()
                    .all(|column| primary_key.contains(column))
        };

        trace!(join = %join.name, legs = legs.len(), "Evaluating join table");

        for (i, &(c1, a)) in legs.iter().enumerate() {
            for &(c2, b) in &legs[i + 1..] {
                if a == b && policy == SelfJoinPolicy::Exclude {
                    continue;
                }
                let forward = Relation::many_to_many(a, join.id, b, c1, c2);
                let backward = Relation::many_to_many(b, join.id, a, c2, c1);
                let pk_joined = within_primary_key(c1) && within_primary_key(c2);

                for relation in [forward, backward] {
                    index
                        .all
                        .entry(relation.source)
                        .or_default()
                        .push(relation);
                    if pk_joined {
                        index
                            .primary_key_joined
                            .entry(relation.source)
                            .or_default()
                            .push(relation);
                    }
                }
            }
        }
    }
    index
}
