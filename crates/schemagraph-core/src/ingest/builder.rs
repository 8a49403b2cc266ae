//! Three-pass graph construction from catalog rows.

use super::parse::{column_type, default_value, parse_enum_labels};
use super::rows::{ColumnRow, ConstraintRow, IndexRow};
use crate::config::GraphConfig;
use crate::error::{EntityKind, Error, Result};
use crate::graph::{
    ConstraintKind, Database, NewColumn, NewConstraint, NewIndex, NewTable, QualifiedName,
    ReferentialAction, TableId, TableKind,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Ingest batch, in the order batches must arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Pass {
    Columns,
    Indexes,
    Constraints,
}

impl Pass {
    fn label(self) -> &'static str {
        match self {
            Pass::Columns => "column",
            Pass::Indexes => "index",
            Pass::Constraints => "constraint",
        }
    }
}

/// `(schema, table, entity name)`
type GroupKey = (String, String, String);

/// Push-driven builder for a [`Database`] graph.
///
/// Rows are accepted in three batches: table/column rows, then index rows, then
/// constraint rows. Index and constraint rows carry one key column each and are
/// grouped by name until their batch ends. The first failure poisons the
/// builder; the partially built graph is never handed out.
#[derive(Debug)]
pub struct CatalogIngest {
    db: Database,
    pass: Pass,
    poisoned: bool,
    rows: usize,
    pending_indexes: BTreeMap<GroupKey, Vec<IndexRow>>,
    pending_constraints: BTreeMap<GroupKey, Vec<ConstraintRow>>,
}

impl CatalogIngest {
    /// Start building a database graph.
    pub fn new(name: impl Into<String>, config: GraphConfig) -> Self {
        Self {
            db: Database::new(name, config),
            pass: Pass::Columns,
            poisoned: false,
            rows: 0,
            pending_indexes: BTreeMap::new(),
            pending_constraints: BTreeMap::new(),
        }
    }

    /// Add a table/column row, creating schema and table on first sight.
    pub fn push_column_row(&mut self, row: ColumnRow) -> Result<()> {
        self.guarded(Pass::Columns, |ingest| {
            ingest.note_catalog(row.catalog_name.as_deref())?;
            ingest.apply_column_row(row)
        })
    }

    /// Add one key column of an index.
    pub fn push_index_row(&mut self, row: IndexRow) -> Result<()> {
        self.guarded(Pass::Indexes, |ingest| {
            ingest.note_catalog(row.catalog_name.as_deref())?;
            ingest.resolve_table(&row.schema_name, &row.table_name, &row.index_name)?;
            let key = (
                row.schema_name.clone(),
                row.table_name.clone(),
                row.index_name.clone(),
            );
            ingest.pending_indexes.entry(key).or_default().push(row);
            Ok(())
        })
    }

    /// Add one key column of a constraint.
    pub fn push_constraint_row(&mut self, row: ConstraintRow) -> Result<()> {
        self.guarded(Pass::Constraints, |ingest| {
            ingest.note_catalog(row.catalog_name.as_deref())?;
            ingest.resolve_table(&row.schema_name, &row.table_name, &row.constraint_name)?;
            let key = (
                row.schema_name.clone(),
                row.table_name.clone(),
                row.constraint_name.clone(),
            );
            ingest.pending_constraints.entry(key).or_default().push(row);
            Ok(())
        })
    }

    fn note_catalog(&mut self, catalog: Option<&str>) -> Result<()> {
        match catalog.filter(|c| !c.is_empty()) {
            Some(catalog) => self.db.set_catalog(catalog),
            None => Ok(()),
        }
    }

    /// Flush pending groups, freeze the graph and hand it out.
    #[instrument(skip(self), fields(database = %self.db.name()))]
    pub fn finish(mut self) -> Result<Database> {
        if self.poisoned {
            return Err(Error::IngestAborted);
        }
        self.advance(Pass::Constraints)?;
        self.flush_constraints()?;
        self.db.freeze()?;
        info!(rows = self.rows, tables = self.db.table_count(), "Catalog ingest complete");
        Ok(self.db)
    }

    fn guarded<F>(&mut self, pass: Pass, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.poisoned {
            return Err(Error::IngestAborted);
        }
        let result = match self.advance(pass) {
            Ok(()) => apply(&mut *self),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.rows += 1;
                Ok(())
            }
            Err(e) => {
                warn!(database = %self.db.name(), error = %e, "Catalog ingest aborted");
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Move to `pass`, flushing the batches it leaves behind.
    fn advance(&mut self, pass: Pass) -> Result<()> {
        if pass < self.pass {
            return Err(Error::PassOrder {
                expected: self.pass.label(),
                found: pass.label(),
            });
        }
        if self.pass < Pass::Indexes && pass >= Pass::Indexes {
            debug!(tables = self.db.table_count(), "Column pass complete");
        }
        if self.pass < Pass::Constraints && pass == Pass::Constraints {
            self.flush_indexes()?;
        }
        self.pass = pass;
        Ok(())
    }

    fn resolve_table(&self, schema: &str, table: &str, referrer: &str) -> Result<TableId> {
        let schema_entry = self.db.schema(schema).ok_or_else(|| Error::Resolution {
            kind: EntityKind::Schema,
            name: schema.to_string(),
            context: format!("`{referrer}`"),
        })?;
        schema_entry
            .table_id(table)
            .ok_or_else(|| Error::Resolution {
                kind: EntityKind::Table,
                name: format!("{schema}.{table}"),
                context: format!("`{referrer}`"),
            })
    }

    fn apply_column_row(&mut self, row: ColumnRow) -> Result<()> {
        let schema = self.db.add_schema(&row.schema_name)?;
        let mut table = NewTable::new(row.table_name.as_str());
        if let Some(kind) = row.table_type.as_deref() {
            table = table.with_kind(TableKind::from_catalog(kind).unwrap_or_default());
        }
        if let Some(comment) = row.table_comment {
            table = table.with_comment(comment);
        }
        if let Some(annotations) = row.table_annotations {
            table = table.with_annotations(annotations);
        }
        let table = self.db.add_table(schema, table)?;

        let domain = row.domain_name.map(|name| QualifiedName {
            schema: row
                .domain_schema
                .unwrap_or_else(|| row.schema_name.clone()),
            name,
        });
        let column_type = column_type(
            &row.data_type,
            row.length,
            row.precision,
            row.scale,
            domain,
            row.user_defined_type,
        );

        let mut column = NewColumn::new(row.column_name, row.ordinal_position, column_type);
        column.nullable = row.is_nullable;
        column.default = default_value(row.column_default.as_deref());
        column.enum_labels = parse_enum_labels(row.enum_labels.as_deref());
        column.comment = row.column_comment;
        self.db.add_column(table, column)?;
        Ok(())
    }

    fn flush_indexes(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_indexes);
        let count = pending.len();
        for ((schema, table, name), mut rows) in pending {
            rows.sort_by_key(|row| row.ordinal_position);
            let table = self.resolve_table(&schema, &table, &name)?;
            let unique = rows.iter().any(|row| row.is_unique);
            let primary_key = rows.iter().any(|row| row.is_primary_key);

            let mut index = NewIndex::new(name, rows.into_iter().map(|row| row.column_name));
            if unique {
                index = index.unique();
            }
            if primary_key {
                index = index.primary_key();
            }
            self.db.add_index(table, index)?;
        }
        debug!(indexes = count, "Index pass complete");
        Ok(())
    }

    fn flush_constraints(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_constraints);
        let count = pending.len();
        for ((schema, table, name), mut rows) in pending {
            rows.sort_by_key(|row| row.ordinal_position);
            let table = self.resolve_table(&schema, &table, &name)?;
            let Some(constraint) = constraint_from_rows(name, rows)? else {
                continue;
            };
            self.db.add_constraint(table, constraint)?;
        }
        debug!(constraints = count, "Constraint pass complete");
        Ok(())
    }
}

/// Fold the rows of one constraint into a [`NewConstraint`]. Unsupported kinds
/// (exclusion constraints, triggers) are skipped.
fn constraint_from_rows(name: String, rows: Vec<ConstraintRow>) -> Result<Option<NewConstraint>> {
    let Some(first) = rows.first().cloned() else {
        return Ok(None);
    };
    let Some(kind) = ConstraintKind::from_catalog(&first.constraint_type) else {
        warn!(constraint = %name, kind = %first.constraint_type, "Skipping unsupported constraint kind");
        return Ok(None);
    };

    let columns: Vec<String> = rows
        .iter()
        .filter(|row| !row.column_name.is_empty())
        .map(|row| row.column_name.clone())
        .collect();

    let mut constraint = match kind {
        ConstraintKind::PrimaryKey => NewConstraint::primary_key(name, columns),
        ConstraintKind::Unique => NewConstraint::unique(name, columns),
        ConstraintKind::Check => {
            NewConstraint::check(name, columns, first.check_clause.clone().unwrap_or_default())
        }
        ConstraintKind::ForeignKey => {
            let (Some(schema), Some(table)) = (first.referenced_schema, first.referenced_table)
            else {
                return Err(Error::InvalidConstraint {
                    name,
                    reason: "foreign key row without referenced table".to_string(),
                });
            };
            let referenced: Vec<String> = rows
                .iter()
                .filter_map(|row| row.referenced_column.clone())
                .collect();
            NewConstraint::foreign_key(name, columns, schema, table, referenced).with_rules(
                first
                    .update_rule
                    .as_deref()
                    .and_then(ReferentialAction::from_catalog),
                first
                    .delete_rule
                    .as_deref()
                    .and_then(ReferentialAction::from_catalog),
            )
        }
    };
    if let Some(option) = first.match_option {
        constraint = constraint.with_match_option(option);
    }
    constraint.comment = first.constraint_comment;
    Ok(Some(constraint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, name: &str, ordinal: u32) -> ColumnRow {
        ColumnRow {
            schema_name: "public".into(),
            table_name: table.into(),
            column_name: name.into(),
            ordinal_position: ordinal,
            data_type: "integer".into(),
            is_nullable: true,
            ..Default::default()
        }
    }

    fn pk(table: &str, column: &str) -> ConstraintRow {
        ConstraintRow {
            schema_name: "public".into(),
            table_name: table.into(),
            constraint_name: format!("{table}_pkey"),
            constraint_type: "PRIMARY KEY".into(),
            column_name: column.into(),
            ordinal_position: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_pass_order_enforced() {
        let mut ingest = CatalogIngest::new("db", GraphConfig::default());
        ingest.push_column_row(column("account", "id", 1)).unwrap();
        ingest.push_constraint_row(pk("account", "id")).unwrap();

        let err = ingest.push_column_row(column("account", "name", 2)).unwrap_err();
        assert!(matches!(
            err,
            Error::PassOrder {
                expected: "constraint",
                found: "column"
            }
        ));
        assert!(matches!(ingest.finish(), Err(Error::IngestAborted)));
    }

    #[test]
    fn test_poisoned_after_failure() {
        let mut ingest = CatalogIngest::new("db", GraphConfig::default());
        ingest.push_column_row(column("account", "id", 1)).unwrap();
        assert!(ingest.push_constraint_row(pk("missing", "id")).is_err());
        assert!(matches!(
            ingest.push_constraint_row(pk("account", "id")),
            Err(Error::IngestAborted)
        ));
    }

    #[test]
    fn test_composite_key_sorted_by_ordinal() {
        let mut ingest = CatalogIngest::new("db", GraphConfig::default());
        ingest.push_column_row(column("line_item", "cart_id", 1)).unwrap();
        ingest.push_column_row(column("line_item", "product_id", 2)).unwrap();

        let mut second = pk("line_item", "cart_id");
        second.ordinal_position = 2;
        let mut first = pk("line_item", "product_id");
        first.ordinal_position = 1;
        ingest.push_constraint_row(second).unwrap();
        ingest.push_constraint_row(first).unwrap();

        let db = ingest.finish().unwrap();
        let table = db.table_by_name("public", "line_item").unwrap().id;
        let names: Vec<_> = db
            .primary_key_columns(table)
            .iter()
            .map(|&c| db.column(c).name.clone())
            .collect();
        assert_eq!(names, vec!["product_id", "cart_id"]);
    }

    #[test]
    fn test_unsupported_constraint_kind_skipped() {
        let mut ingest = CatalogIngest::new("db", GraphConfig::default());
        ingest.push_column_row(column("booking", "during", 1)).unwrap();
        let mut exclusion = pk("booking", "during");
        exclusion.constraint_name = "booking_excl".into();
        exclusion.constraint_type = "EXCLUDE".into();
        ingest.push_constraint_row(exclusion).unwrap();

        let db = ingest.finish().unwrap();
        let table = db.table_by_name("public", "booking").unwrap().id;
        assert_eq!(db.constraints(table).count(), 0);
    }
}
