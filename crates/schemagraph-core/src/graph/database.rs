//! The database root and the arenas holding every entity.

use super::derived::{DatabaseCache, TableCache};
use super::entity::{
    Column, Constraint, ConstraintKind, Index, NewColumn, NewConstraint, NewIndex, NewTable,
    Schema, Table, TableVersions,
};
use super::ids::{ColumnId, ConstraintId, IndexId, SchemaId, TableId};
use crate::cache::{CacheCounters, CacheStats, Version};
use crate::config::GraphConfig;
use crate::error::{EntityKind, Error, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Root of a catalog graph.
///
/// Entities are stored in arenas and addressed by typed identifiers; parents own
/// their children through ordered name maps, children point back to their parent
/// by identifier. The graph only grows: entities are appended during ingest and
/// never removed. After [`freeze`](Database::freeze) every mutation fails with
/// [`Error::FrozenGraph`].
#[derive(Debug)]
pub struct Database {
    name: String,
    catalog: Option<String>,
    config: GraphConfig,
    frozen: bool,
    schema_names: BTreeMap<String, SchemaId>,
    pub(crate) schemas: Vec<Schema>,
    pub(crate) tables: Vec<Table>,
    pub(crate) columns: Vec<Column>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) indexes: Vec<Index>,
    /// Bumped on every constraint append anywhere in the graph.
    pub(crate) constraints_version: Version,
    pub(crate) cache: DatabaseCache,
    pub(crate) stats: CacheStats,
}

impl Database {
    /// Create an empty, mutable database graph.
    pub fn new(name: impl Into<String>, config: GraphConfig) -> Self {
        Self {
            name: name.into(),
            catalog: None,
            config,
            frozen: false,
            schema_names: BTreeMap::new(),
            schemas: Vec::new(),
            tables: Vec::new(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            constraints_version: Version::default(),
            cache: DatabaseCache::default(),
            stats: CacheStats::default(),
        }
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog the graph was read from; the database name when no row named one.
    pub fn catalog_name(&self) -> &str {
        self.catalog.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    /// Configuration the graph was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Whether construction is complete.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Cache hit and recomputation counters.
    pub fn cache_stats(&self) -> CacheCounters {
        self.stats.counters()
    }

    /// Mark construction complete. Allowed exactly once.
    pub fn freeze(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        self.frozen = true;
        info!(
            database = %self.name,
            schemas = self.schemas.len(),
            tables = self.tables.len(),
            columns = self.columns.len(),
            constraints = self.constraints.len(),
            indexes = self.indexes.len(),
            "Database graph frozen"
        );
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::FrozenGraph {
                database: self.name.clone(),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Schemas in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> + '_ {
        self.schema_names.values().map(|id| &self.schemas[id.index()])
    }

    /// Schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schema_names.get(name).map(|id| &self.schemas[id.index()])
    }

    /// Schema by identifier.
    pub fn schema_by_id(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.index()]
    }

    /// Tables of a schema in name order.
    pub fn tables(&self, schema: SchemaId) -> impl Iterator<Item = &Table> + '_ {
        self.schemas[schema.index()]
            .table_ids()
            .map(|id| &self.tables[id.index()])
    }

    /// Every table, ordered by schema name then table name.
    pub fn all_tables(&self) -> impl Iterator<Item = &Table> + '_ {
        self.schemas().flat_map(|schema| self.tables(schema.id))
    }

    /// Table by identifier.
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }

    /// Table by schema and table name.
    pub fn table_by_name(&self, schema: &str, table: &str) -> Option<&Table> {
        self.schema(schema)
            .and_then(|s| s.table_id(table))
            .map(|id| self.table(id))
    }

    /// `schema.table` name of a table.
    pub fn table_full_name(&self, id: TableId) -> String {
        let table = self.table(id);
        format!("{}.{}", self.schemas[table.schema.index()].name, table.name)
    }

    /// `catalog.schema` name of a schema.
    pub fn schema_catalog_name(&self, id: SchemaId) -> String {
        format!("{}.{}", self.catalog_name(), self.schema_by_id(id).name)
    }

    /// `catalog.schema.table` name of a table.
    pub fn table_catalog_name(&self, id: TableId) -> String {
        format!("{}.{}", self.catalog_name(), self.table_full_name(id))
    }

    /// Columns of a table in definition order.
    pub fn columns(&self, table: TableId) -> impl Iterator<Item = &Column> + '_ {
        self.tables[table.index()]
            .columns
            .iter()
            .map(|id| &self.columns[id.index()])
    }

    /// Column by identifier.
    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.index()]
    }

    /// `schema.table.column` name of a column.
    pub fn column_full_name(&self, id: ColumnId) -> String {
        let column = self.column(id);
        format!("{}.{}", self.table_full_name(column.table), column.name)
    }

    /// `catalog.schema.table.column` name of a column.
    pub fn column_catalog_name(&self, id: ColumnId) -> String {
        format!("{}.{}", self.catalog_name(), self.column_full_name(id))
    }

    /// Constraints of a table in name order.
    pub fn constraints(&self, table: TableId) -> impl Iterator<Item = &Constraint> + '_ {
        self.tables[table.index()]
            .constraint_ids()
            .map(|id| &self.constraints[id.index()])
    }

    /// Constraint by identifier.
    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.index()]
    }

    /// `schema.table.constraint` name of a constraint.
    pub fn constraint_full_name(&self, id: ConstraintId) -> String {
        let constraint = self.constraint(id);
        format!("{}.{}", self.table_full_name(constraint.table), constraint.name)
    }

    /// `catalog.schema.table.constraint` name of a constraint.
    pub fn constraint_catalog_name(&self, id: ConstraintId) -> String {
        format!("{}.{}", self.catalog_name(), self.constraint_full_name(id))
    }

    /// Indexes of a table in name order.
    pub fn indexes(&self, table: TableId) -> impl Iterator<Item = &Index> + '_ {
        self.tables[table.index()]
            .index_ids()
            .map(|id| &self.indexes[id.index()])
    }

    /// Index by identifier.
    pub fn index(&self, id: IndexId) -> &Index {
        &self.indexes[id.index()]
    }

    /// `schema.table.index` name of an index.
    pub fn index_full_name(&self, id: IndexId) -> String {
        let index = self.index(id);
        format!("{}.{}", self.table_full_name(index.table), index.name)
    }

    /// `catalog.schema.table.index` name of an index.
    pub fn index_catalog_name(&self, id: IndexId) -> String {
        format!("{}.{}", self.catalog_name(), self.index_full_name(id))
    }

    /// Number of tables in the graph.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Record the catalog the graph is read from. The first catalog wins; rows
    /// naming a different one are logged and otherwise ignored.
    pub fn set_catalog(&mut self, catalog: &str) -> Result<()> {
        self.ensure_mutable()?;
        match self.catalog.as_deref() {
            Some(existing) if existing != catalog => {
                warn!(database = %self.name, existing, ignored = catalog, "Rows name a second catalog");
            }
            Some(_) => {}
            None => self.catalog = Some(catalog.to_string()),
        }
        Ok(())
    }

    /// Get or create a schema.
    pub fn add_schema(&mut self, name: &str) -> Result<SchemaId> {
        self.ensure_mutable()?;
        if let Some(id) = self.schema_names.get(name) {
            return Ok(*id);
        }
        let id = next_id("schema", SchemaId::from_index(self.schemas.len()))?;
        self.schemas.push(Schema::new(id, name.to_string()));
        self.schema_names.insert(name.to_string(), id);
        debug!(schema = name, "Schema added");
        Ok(id)
    }

    /// Get or create a table. An existing table keeps its attributes.
    pub fn add_table(&mut self, schema: SchemaId, table: NewTable) -> Result<TableId> {
        self.ensure_mutable()?;
        if let Some(id) = self.schemas[schema.index()].table_id(&table.name) {
            return Ok(id);
        }
        let id = next_id("table", TableId::from_index(self.tables.len()))?;
        self.schemas[schema.index()]
            .tables
            .insert(table.name.clone(), id);
        debug!(schema = %self.schemas[schema.index()].name, table = %table.name, "Table added");
        self.tables.push(Table {
            id,
            schema,
            name: table.name,
            kind: table.kind,
            comment: table.comment,
            annotations: table.annotations,
            columns: Vec::new(),
            column_names: HashMap::new(),
            constraints: BTreeMap::new(),
            indexes: BTreeMap::new(),
            versions: TableVersions::default(),
            cache: TableCache::default(),
        });
        Ok(id)
    }

    /// Get or create a column. Columns are kept in ordinal order regardless of
    /// the order they are added in.
    pub fn add_column(&mut self, table: TableId, column: NewColumn) -> Result<ColumnId> {
        self.ensure_mutable()?;
        if let Some(id) = self.tables[table.index()].column_id(&column.name) {
            return Ok(id);
        }
        let id = next_id("column", ColumnId::from_index(self.columns.len()))?;
        let ordinal = column.ordinal;
        self.columns.push(Column {
            id,
            table,
            name: column.name.clone(),
            ordinal,
            column_type: column.column_type,
            default: column.default,
            nullable: column.nullable,
            enum_labels: column.enum_labels,
            comment: column.comment,
        });

        let columns = &self.columns;
        let entry = &mut self.tables[table.index()];
        let position = entry
            .columns
            .partition_point(|existing| columns[existing.index()].ordinal <= ordinal);
        entry.columns.insert(position, id);
        entry.column_names.insert(column.name, id);
        entry.versions.columns.bump();
        Ok(id)
    }

    /// Get or create a constraint, resolving its column names (and for foreign
    /// keys the referenced table and columns) against the graph.
    pub fn add_constraint(
        &mut self,
        table: TableId,
        constraint: NewConstraint,
    ) -> Result<ConstraintId> {
        self.ensure_mutable()?;
        if let Some(id) = self.tables[table.index()].constraint_id(&constraint.name) {
            return Ok(id);
        }

        let context = format!(
            "constraint `{}` on `{}`",
            constraint.name,
            self.table_full_name(table)
        );

        if constraint.kind != ConstraintKind::Check && constraint.columns.is_empty() {
            return Err(Error::InvalidConstraint {
                name: constraint.name,
                reason: "key column list is empty".to_string(),
            });
        }
        if constraint.kind == ConstraintKind::PrimaryKey
            && self
                .constraints(table)
                .any(|existing| existing.is_primary_key())
        {
            return Err(Error::InvalidConstraint {
                name: constraint.name,
                reason: format!("`{}` already has a primary key", self.table_full_name(table)),
            });
        }

        let columns = self.resolve_columns(table, &constraint.columns, &context)?;

        let (referenced_table, referenced_columns) = match (&constraint.kind, &constraint.references)
        {
            (ConstraintKind::ForeignKey, Some(target)) => {
                let target_table = self
                    .table_by_name(&target.schema, &target.table)
                    .map(|t| t.id)
                    .ok_or_else(|| Error::Resolution {
                        kind: EntityKind::Table,
                        name: format!("{}.{}", target.schema, target.table),
                        context: context.clone(),
                    })?;
                if target.columns.len() != columns.len() {
                    return Err(Error::InvalidConstraint {
                        name: constraint.name,
                        reason: format!(
                            "{} local columns but {} referenced columns",
                            columns.len(),
                            target.columns.len()
                        ),
                    });
                }
                let referenced = self.resolve_columns(target_table, &target.columns, &context)?;
                (Some(target_table), referenced)
            }
            (ConstraintKind::ForeignKey, None) => {
                return Err(Error::InvalidConstraint {
                    name: constraint.name,
                    reason: "foreign key without referenced table".to_string(),
                });
            }
            _ => (None, Vec::new()),
        };

        let id = next_id("constraint", ConstraintId::from_index(self.constraints.len()))?;
        debug!(constraint = %constraint.name, kind = ?constraint.kind, %context, "Constraint added");
        self.constraints.push(Constraint {
            id,
            table,
            name: constraint.name.clone(),
            kind: constraint.kind,
            columns,
            referenced_table,
            referenced_columns,
            match_option: constraint.match_option,
            on_update: constraint.on_update,
            on_delete: constraint.on_delete,
            check_clause: constraint.check_clause,
            comment: constraint.comment,
        });
        let entry = &mut self.tables[table.index()];
        entry.constraints.insert(constraint.name, id);
        entry.versions.constraints.bump();
        self.constraints_version.bump();
        Ok(id)
    }

    /// Get or create an index, resolving its column names against the table.
    pub fn add_index(&mut self, table: TableId, index: NewIndex) -> Result<IndexId> {
        self.ensure_mutable()?;
        if let Some(id) = self.tables[table.index()].index_id(&index.name) {
            return Ok(id);
        }
        let context = format!("index `{}` on `{}`", index.name, self.table_full_name(table));
        let columns = self.resolve_columns(table, &index.columns, &context)?;

        let id = next_id("index", IndexId::from_index(self.indexes.len()))?;
        self.indexes.push(Index {
            id,
            table,
            name: index.name.clone(),
            columns,
            unique: index.unique || index.primary_key,
            primary_key: index.primary_key,
        });
        let entry = &mut self.tables[table.index()];
        entry.indexes.insert(index.name, id);
        entry.versions.indexes.bump();
        Ok(id)
    }

    fn resolve_columns(
        &self,
        table: TableId,
        names: &[String],
        context: &str,
    ) -> Result<Vec<ColumnId>> {
        let entry = &self.tables[table.index()];
        names
            .iter()
            .map(|name| {
                entry.column_id(name).ok_or_else(|| Error::Resolution {
                    kind: EntityKind::Column,
                    name: format!("{}.{}", self.table_full_name(table), name),
                    context: context.to_string(),
                })
            })
            .collect()
    }
}

fn next_id<I>(arena: &'static str, id: Option<I>) -> Result<I> {
    id.ok_or(Error::ArenaFull { arena })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::entity::ColumnType;

    fn account_db() -> (Database, TableId) {
        let mut db = Database::new("crm", GraphConfig::default());
        let public = db.add_schema("public").unwrap();
        let account = db.add_table(public, NewTable::new("account")).unwrap();
        db.add_column(account, NewColumn::new("id", 1, ColumnType::new("integer")).not_null())
            .unwrap();
        db.add_column(account, NewColumn::new("name", 2, ColumnType::new("text")))
            .unwrap();
        (db, account)
    }

    #[test]
    fn test_get_or_create() {
        let (mut db, account) = account_db();
        let public = db.add_schema("public").unwrap();
        assert_eq!(db.add_table(public, NewTable::new("account")).unwrap(), account);

        let again = db
            .add_column(account, NewColumn::new("id", 1, ColumnType::new("bigint")))
            .unwrap();
        assert_eq!(db.column(again).column_type.base, "integer");
        assert_eq!(db.table(account).versions().columns.get(), 2);
    }

    #[test]
    fn test_columns_follow_ordinal_order() {
        let mut db = Database::new("crm", GraphConfig::default());
        let public = db.add_schema("public").unwrap();
        let t = db.add_table(public, NewTable::new("t")).unwrap();
        db.add_column(t, NewColumn::new("c", 3, ColumnType::new("text"))).unwrap();
        db.add_column(t, NewColumn::new("a", 1, ColumnType::new("text"))).unwrap();
        db.add_column(t, NewColumn::new("b", 2, ColumnType::new("text"))).unwrap();

        let names: Vec<_> = db.columns(t).map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_schemas_and_tables_in_name_order() {
        let mut db = Database::new("crm", GraphConfig::default());
        let zeta = db.add_schema("zeta").unwrap();
        let alpha = db.add_schema("alpha").unwrap();
        db.add_table(alpha, NewTable::new("orders")).unwrap();
        db.add_table(alpha, NewTable::new("customers")).unwrap();
        db.add_table(zeta, NewTable::new("audit")).unwrap();

        let schemas: Vec<_> = db.schemas().map(|s| s.name.as_str()).collect();
        assert_eq!(schemas, vec!["alpha", "zeta"]);
        let tables: Vec<_> = db.all_tables().map(|t| t.name.as_str()).collect();
        assert_eq!(tables, vec!["customers", "orders", "audit"]);
    }

    #[test]
    fn test_constraint_resolution_failure() {
        let (mut db, account) = account_db();
        let err = db
            .add_constraint(
                account,
                NewConstraint::foreign_key("account_owner_fk", ["name"], "public", "owner", ["id"]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution {
                kind: EntityKind::Table,
                ..
            }
        ));

        let err = db
            .add_constraint(account, NewConstraint::primary_key("account_pkey", ["missing"]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolution {
                kind: EntityKind::Column,
                ..
            }
        ));
        assert_eq!(db.constraints(account).count(), 0);
    }

    #[test]
    fn test_single_primary_key() {
        let (mut db, account) = account_db();
        db.add_constraint(account, NewConstraint::primary_key("account_pkey", ["id"]))
            .unwrap();
        let err = db
            .add_constraint(account, NewConstraint::primary_key("account_pkey2", ["name"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConstraint { .. }));
    }

    #[test]
    fn test_frozen_rejects_mutation() {
        let (mut db, account) = account_db();
        db.freeze().unwrap();
        assert!(db.is_frozen());

        assert!(matches!(db.add_schema("other"), Err(Error::FrozenGraph { .. })));
        assert!(matches!(
            db.add_column(account, NewColumn::new("x", 3, ColumnType::new("text"))),
            Err(Error::FrozenGraph { .. })
        ));
        assert!(matches!(
            db.add_index(account, NewIndex::new("account_name_idx", ["name"])),
            Err(Error::FrozenGraph { .. })
        ));
        assert!(matches!(db.freeze(), Err(Error::FrozenGraph { .. })));
    }

    #[test]
    fn test_full_names() {
        let (db, account) = account_db();
        assert_eq!(db.table_full_name(account), "public.account");
        let name = db.table(account).column_id("name").unwrap();
        assert_eq!(db.column_full_name(name), "public.account.name");
    }

    #[test]
    fn test_catalog_names() {
        let (mut db, account) = account_db();
        assert_eq!(db.catalog_name(), "crm");

        db.set_catalog("crm_prod").unwrap();
        db.set_catalog("other").unwrap();
        assert_eq!(db.catalog_name(), "crm_prod");

        let pkey = db
            .add_constraint(account, NewConstraint::primary_key("account_pkey", ["id"]))
            .unwrap();
        let index = db
            .add_index(account, NewIndex::new("account_pkey", ["id"]).primary_key())
            .unwrap();
        let id = db.table(account).column_id("id").unwrap();
        let public = db.table(account).schema;

        assert_eq!(db.schema_catalog_name(public), "crm_prod.public");
        assert_eq!(db.table_catalog_name(account), "crm_prod.public.account");
        assert_eq!(db.column_catalog_name(id), "crm_prod.public.account.id");
        assert_eq!(db.constraint_full_name(pkey), "public.account.account_pkey");
        assert_eq!(
            db.constraint_catalog_name(pkey),
            "crm_prod.public.account.account_pkey"
        );
        assert_eq!(
            db.index_catalog_name(index),
            "crm_prod.public.account.account_pkey"
        );

        db.freeze().unwrap();
        assert!(matches!(db.set_catalog("x"), Err(Error::FrozenGraph { .. })));
    }
}
