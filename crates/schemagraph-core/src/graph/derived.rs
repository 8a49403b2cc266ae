//! Cached derived views over the graph.
//!
//! Each view is backed by a [`CacheSlot`] stamped with the versions of the
//! collections it reads. Table-local views stamp with the table's own counters;
//! views that scan other tables' constraints stamp with the database-wide
//! constraint counter.

use super::database::Database;
use super::entity::{Constraint, Index};
use super::ids::{ColumnId, ConstraintId, IndexId, TableId};
use crate::cache::CacheSlot;
use crate::config::NamingStrategy;
use crate::relation::infer::{self, ManyToManyIndex};
use crate::relation::naming;
use crate::relation::{NamedRelation, Relation};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-table cache slots.
#[derive(Debug, Default)]
pub(crate) struct TableCache {
    primary_key_columns: CacheSlot<Vec<ColumnId>>,
    foreign_key_constraints: CacheSlot<Vec<ConstraintId>>,
    foreign_key_columns: CacheSlot<Vec<ColumnId>>,
    foreign_keys_to_this: CacheSlot<Vec<ConstraintId>>,
    serial_columns: CacheSlot<Vec<ColumnId>>,
    indexes_by_column: CacheSlot<HashMap<ColumnId, Vec<IndexId>>>,
    foreign_keys_by_column: CacheSlot<HashMap<ColumnId, Vec<ConstraintId>>>,
    many_to_one: CacheSlot<Vec<Relation>>,
    one_to_many: CacheSlot<Vec<Relation>>,
    many_to_many: CacheSlot<Vec<Relation>>,
    many_to_many_pk: CacheSlot<Vec<Relation>>,
    relations: CacheSlot<Vec<Relation>>,
    named_simple: CacheSlot<Vec<NamedRelation>>,
    named_complex: CacheSlot<Vec<NamedRelation>>,
    has_many_tables: CacheSlot<Vec<TableId>>,
    belongs_to_tables: CacheSlot<Vec<TableId>>,
    belongs_to_many_tables: CacheSlot<Vec<TableId>>,
    belongs_to_many_tables_pk: CacheSlot<Vec<TableId>>,
}

/// Database-wide cache slots.
#[derive(Debug, Default)]
pub(crate) struct DatabaseCache {
    foreign_keys_by_target: CacheSlot<HashMap<TableId, Vec<ConstraintId>>>,
    many_to_many: CacheSlot<ManyToManyIndex>,
}

impl Database {
    fn constraints_stamp(&self, table: TableId) -> [u64; 1] {
        [self.table(table).versions.constraints.get()]
    }

    fn global_stamp(&self) -> [u64; 1] {
        [self.constraints_version.get()]
    }

    // -------------------------------------------------------------------------
    // Table views
    // -------------------------------------------------------------------------

    /// The table's primary key constraint, if any.
    pub fn primary_key_constraint(&self, table: TableId) -> Option<&Constraint> {
        self.constraints(table).find(|c| c.is_primary_key())
    }

    /// Columns of the primary key in key order.
    pub fn primary_key_columns(&self, table: TableId) -> Arc<Vec<ColumnId>> {
        self.table(table).cache.primary_key_columns.get_or_refresh(
            self.config().cache,
            &self.constraints_stamp(table),
            &self.stats,
            || {
                self.primary_key_constraint(table)
                    .map(|c| c.columns.clone())
                    .unwrap_or_default()
            },
        )
    }

    /// Foreign keys owned by the table, in name order.
    pub fn foreign_key_constraints(&self, table: TableId) -> Arc<Vec<ConstraintId>> {
        self.table(table).cache.foreign_key_constraints.get_or_refresh(
            self.config().cache,
            &self.constraints_stamp(table),
            &self.stats,
            || {
                self.constraints(table)
                    .filter(|c| c.is_foreign_key())
                    .map(|c| c.id)
                    .collect()
            },
        )
    }

    /// Columns taking part in any foreign key, in definition order.
    pub fn foreign_key_columns(&self, table: TableId) -> Arc<Vec<ColumnId>> {
        let entry = self.table(table);
        entry.cache.foreign_key_columns.get_or_refresh(
            self.config().cache,
            &[entry.versions.columns.get(), entry.versions.constraints.get()],
            &self.stats,
            || {
                let members: HashSet<ColumnId> = self
                    .foreign_key_constraints(table)
                    .iter()
                    .flat_map(|&id| self.constraint(id).columns.iter().copied())
                    .collect();
                self.table(table)
                    .column_ids()
                    .iter()
                    .copied()
                    .filter(|id| members.contains(id))
                    .collect()
            },
        )
    }

    /// Foreign keys anywhere in the graph that reference the table.
    pub fn foreign_key_constraints_to(&self, table: TableId) -> Arc<Vec<ConstraintId>> {
        self.table(table).cache.foreign_keys_to_this.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || {
                self.foreign_keys_by_target()
                    .get(&table)
                    .cloned()
                    .unwrap_or_default()
            },
        )
    }

    fn foreign_keys_by_target(&self) -> Arc<HashMap<TableId, Vec<ConstraintId>>> {
        self.cache.foreign_keys_by_target.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || infer::foreign_keys_by_target(self),
        )
    }

    /// Columns filled from a sequence, in definition order.
    pub fn serial_columns(&self, table: TableId) -> Arc<Vec<ColumnId>> {
        let entry = self.table(table);
        entry.cache.serial_columns.get_or_refresh(
            self.config().cache,
            &[entry.versions.columns.get()],
            &self.stats,
            || {
                self.columns(table)
                    .filter(|c| c.is_serial())
                    .map(|c| c.id)
                    .collect()
            },
        )
    }

    // -------------------------------------------------------------------------
    // Column views
    // -------------------------------------------------------------------------

    fn indexes_by_column(&self, table: TableId) -> Arc<HashMap<ColumnId, Vec<IndexId>>> {
        let entry = self.table(table);
        entry.cache.indexes_by_column.get_or_refresh(
            self.config().cache,
            &[entry.versions.indexes.get()],
            &self.stats,
            || {
                let mut map: HashMap<ColumnId, Vec<IndexId>> = HashMap::new();
                for index in self.indexes(table) {
                    for column in &index.columns {
                        let ids = map.entry(*column).or_default();
                        if !ids.contains(&index.id) {
                            ids.push(index.id);
                        }
                    }
                }
                map
            },
        )
    }

    fn foreign_keys_by_column(&self, table: TableId) -> Arc<HashMap<ColumnId, Vec<ConstraintId>>> {
        self.table(table).cache.foreign_keys_by_column.get_or_refresh(
            self.config().cache,
            &self.constraints_stamp(table),
            &self.stats,
            || {
                let mut map: HashMap<ColumnId, Vec<ConstraintId>> = HashMap::new();
                for &id in self.foreign_key_constraints(table).iter() {
                    for column in &self.constraint(id).columns {
                        map.entry(*column).or_default().push(id);
                    }
                }
                map
            },
        )
    }

    /// Indexes the column takes part in, in index name order.
    pub fn column_indexes(&self, column: ColumnId) -> Vec<IndexId> {
        self.indexes_by_column(self.column(column).table)
            .get(&column)
            .cloned()
            .unwrap_or_default()
    }

    fn column_indexes_where(&self, column: ColumnId, keep: impl Fn(&Index) -> bool) -> Vec<IndexId> {
        self.column_indexes(column)
            .into_iter()
            .filter(|&id| keep(self.index(id)))
            .collect()
    }

    /// Unique indexes the column takes part in, primary key index included.
    pub fn unique_indexes(&self, column: ColumnId) -> Vec<IndexId> {
        self.column_indexes_where(column, |index| index.unique)
    }

    /// Unique indexes the column takes part in, primary key index excluded.
    pub fn unique_indexes_no_pk(&self, column: ColumnId) -> Vec<IndexId> {
        self.column_indexes_where(column, |index| index.unique && !index.primary_key)
    }

    /// Foreign keys the column takes part in.
    pub fn column_foreign_keys(&self, column: ColumnId) -> Vec<ConstraintId> {
        self.foreign_keys_by_column(self.column(column).table)
            .get(&column)
            .cloned()
            .unwrap_or_default()
    }

    /// Columns referenced by the column through any of its foreign keys.
    pub fn referenced_columns(&self, column: ColumnId) -> Vec<ColumnId> {
        let mut referenced = Vec::new();
        for id in self.column_foreign_keys(column) {
            for (local, remote) in self.constraint(id).referenced_columns_by() {
                if local == column && !referenced.contains(&remote) {
                    referenced.push(remote);
                }
            }
        }
        referenced
    }

    /// Whether the column is part of the primary key.
    pub fn is_primary_key(&self, column: ColumnId) -> bool {
        self.primary_key_columns(self.column(column).table)
            .contains(&column)
    }

    /// Whether the column is part of a foreign key.
    pub fn is_foreign_key(&self, column: ColumnId) -> bool {
        self.foreign_keys_by_column(self.column(column).table)
            .contains_key(&column)
    }

    // -------------------------------------------------------------------------
    // Relations
    // -------------------------------------------------------------------------

    /// Many-to-one relations: one per foreign key the table owns.
    pub fn many_to_one_relations(&self, table: TableId) -> Arc<Vec<Relation>> {
        self.table(table).cache.many_to_one.get_or_refresh(
            self.config().cache,
            &self.constraints_stamp(table),
            &self.stats,
            || infer::many_to_one(self, table),
        )
    }

    /// One-to-many relations: one per foreign key referencing the table.
    pub fn one_to_many_relations(&self, table: TableId) -> Arc<Vec<Relation>> {
        self.table(table).cache.one_to_many.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || infer::one_to_many(self, table),
        )
    }

    fn many_to_many_index(&self) -> Arc<ManyToManyIndex> {
        self.cache.many_to_many.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || infer::many_to_many_index(self),
        )
    }

    /// Many-to-many relations through any qualifying join table.
    pub fn many_to_many_relations(&self, table: TableId) -> Arc<Vec<Relation>> {
        self.table(table).cache.many_to_many.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || {
                self.many_to_many_index()
                    .all
                    .get(&table)
                    .cloned()
                    .unwrap_or_default()
            },
        )
    }

    /// Many-to-many relations whose join table keys both lie within the join
    /// table's primary key.
    pub fn many_to_many_relations_pk(&self, table: TableId) -> Arc<Vec<Relation>> {
        self.table(table).cache.many_to_many_pk.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || {
                self.many_to_many_index()
                    .primary_key_joined
                    .get(&table)
                    .cloned()
                    .unwrap_or_default()
            },
        )
    }

    /// Every relation of the table: one-to-many, then many-to-one, then many-to-many.
    pub fn relations(&self, table: TableId) -> Arc<Vec<Relation>> {
        self.table(table).cache.relations.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || {
                let mut all = Vec::new();
                all.extend(self.one_to_many_relations(table).iter().copied());
                all.extend(self.many_to_one_relations(table).iter().copied());
                all.extend(self.many_to_many_relations(table).iter().copied());
                all
            },
        )
    }

    /// Every relation of the table, named with the configured strategy.
    pub fn named_relations(&self, table: TableId) -> Arc<Vec<NamedRelation>> {
        self.named_relations_with(table, self.config().naming)
    }

    /// Every relation of the table, named with `strategy`.
    pub fn named_relations_with(
        &self,
        table: TableId,
        strategy: NamingStrategy,
    ) -> Arc<Vec<NamedRelation>> {
        let cache = &self.table(table).cache;
        let slot = match strategy {
            NamingStrategy::Simple => &cache.named_simple,
            NamingStrategy::Complex => &cache.named_complex,
        };
        slot.get_or_refresh(
            self.config().cache,
            &self.global_stamp(),
            &self.stats,
            || naming::name_relations(self, &self.relations(table), strategy),
        )
    }

    /// Name of a single relation, ignoring collisions with its siblings.
    pub fn relation_name(&self, relation: &Relation) -> String {
        naming::relation_name(self, relation)
    }

    fn target_tables(
        &self,
        slot: &CacheSlot<Vec<TableId>>,
        relations: impl FnOnce() -> Arc<Vec<Relation>>,
    ) -> Arc<Vec<TableId>> {
        slot.get_or_refresh(self.config().cache, &self.global_stamp(), &self.stats, || {
            let mut targets: Vec<TableId> = relations().iter().map(|r| r.target).collect();
            targets.sort_by_cached_key(|&id| self.table_full_name(id));
            targets.dedup();
            targets
        })
    }

    /// Tables this table has one-to-many relations to, by name.
    pub fn has_many_tables(&self, table: TableId) -> Arc<Vec<TableId>> {
        self.target_tables(&self.table(table).cache.has_many_tables, || {
            self.one_to_many_relations(table)
        })
    }

    /// Tables this table references, by name.
    pub fn belongs_to_tables(&self, table: TableId) -> Arc<Vec<TableId>> {
        self.target_tables(&self.table(table).cache.belongs_to_tables, || {
            self.many_to_one_relations(table)
        })
    }

    /// Tables reachable through join tables, by name.
    pub fn belongs_to_many_tables(&self, table: TableId) -> Arc<Vec<TableId>> {
        self.target_tables(&self.table(table).cache.belongs_to_many_tables, || {
            self.many_to_many_relations(table)
        })
    }

    /// Tables reachable through primary-key-joined join tables, by name.
    pub fn belongs_to_many_tables_pk(&self, table: TableId) -> Arc<Vec<TableId>> {
        self.target_tables(&self.table(table).cache.belongs_to_many_tables_pk, || {
            self.many_to_many_relations_pk(table)
        })
    }
}
