//! Subcommand execution.

use crate::error::CliError;
use crate::formatter::{EntityDetail, Formatter, RelationLine, TableSummary};
use schemagraph_core::ingest::ingest;
use schemagraph_core::snapshot::{load, save};
use schemagraph_core::{
    CatalogRows, ColumnId, Database, EntityRef, GraphConfig, NamingStrategy, TableId,
};
use std::path::Path;
use tracing::info;

/// Ingest a JSON catalog dump and write a snapshot.
pub fn build(
    rows: &Path,
    database: &str,
    out: &Path,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let rows = CatalogRows::from_path(rows)?;
    info!(rows = rows.len(), "Catalog dump read");
    let db = ingest(&rows, database, GraphConfig::default())?;
    save(out, &db)?;
    Ok(formatter.format_message(&format!(
        "Wrote {} tables of `{}` to {}",
        db.table_count(),
        db.name(),
        out.display()
    )))
}

fn open(snapshot: &Path, config: GraphConfig) -> Result<Database, CliError> {
    load(snapshot, config)?.ok_or_else(|| CliError::UnsupportedSnapshot(snapshot.to_path_buf()))
}

/// List tables, optionally restricted to one schema.
pub fn tables(
    snapshot: &Path,
    schema: Option<&str>,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let db = open(snapshot, GraphConfig::default())?;
    let summaries: Vec<TableSummary> = db
        .all_tables()
        .filter(|t| schema.map_or(true, |s| db.schema_by_id(t.schema).name == s))
        .map(|t| TableSummary {
            schema: db.schema_by_id(t.schema).name.clone(),
            name: t.name.clone(),
            kind: format!("{:?}", t.kind),
            columns: t.column_ids().len(),
            constraints: t.constraint_ids().count(),
            indexes: t.index_ids().count(),
            relations: db.relations(t.id).len(),
        })
        .collect();
    Ok(formatter.format_tables(&summaries))
}

fn resolve_table(db: &Database, name: &str) -> Result<TableId, CliError> {
    match db.get(name)? {
        Some(EntityRef::Table(id)) => Ok(id),
        Some(_) => Err(CliError::InvalidTableName(name.to_string())),
        None => Err(CliError::TableNotFound(name.to_string())),
    }
}

/// Print a table's named relations.
pub fn relations(
    snapshot: &Path,
    table: &str,
    naming: NamingStrategy,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let db = open(snapshot, GraphConfig::default().with_naming(naming))?;
    let id = resolve_table(&db, table)?;
    let lines: Vec<RelationLine> = db
        .named_relations(id)
        .iter()
        .map(|named| {
            let relation = &named.relation;
            RelationLine {
                name: named.name.clone(),
                cardinality: relation.cardinality.to_string(),
                target: db.table_full_name(relation.target),
                join_table: relation.join_table.map(|j| db.table_full_name(j)),
                constraint: db.constraint(relation.constraint).name.clone(),
            }
        })
        .collect();
    Ok(formatter.format_relations(&lines))
}

/// Resolve a dotted path and describe the entity.
pub fn get(snapshot: &Path, path: &str, formatter: &dyn Formatter) -> Result<String, CliError> {
    let db = open(snapshot, GraphConfig::default())?;
    let detail = match db.get(path)? {
        None => return Ok(formatter.format_message(&format!("`{path}` not found"))),
        Some(EntityRef::Schema(id)) => {
            let schema = db.schema_by_id(id);
            EntityDetail {
                kind: "schema".into(),
                name: schema.name.clone(),
                properties: vec![("tables".into(), schema.table_ids().count().to_string())],
            }
        }
        Some(EntityRef::Table(id)) => table_detail(&db, id),
        Some(EntityRef::Column(id)) => column_detail(&db, id),
    };
    Ok(formatter.format_entity(&detail))
}

fn names(db: &Database, tables: &[TableId]) -> String {
    tables
        .iter()
        .map(|&t| db.table_full_name(t))
        .collect::<Vec<_>>()
        .join(", ")
}

fn table_detail(db: &Database, id: TableId) -> EntityDetail {
    let table = db.table(id);
    let columns = db
        .columns(id)
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let primary_key = db
        .primary_key_columns(id)
        .iter()
        .map(|&c| db.column(c).name.clone())
        .collect::<Vec<_>>()
        .join(", ");

    let mut properties = vec![
        ("kind".to_string(), format!("{:?}", table.kind)),
        ("catalog name".to_string(), db.table_catalog_name(id)),
        ("columns".to_string(), columns),
        ("primary key".to_string(), primary_key),
        ("has many".to_string(), names(db, &db.has_many_tables(id))),
        ("belongs to".to_string(), names(db, &db.belongs_to_tables(id))),
        ("belongs to many".to_string(), names(db, &db.belongs_to_many_tables(id))),
    ];
    if let Some(comment) = &table.comment {
        properties.push(("comment".to_string(), comment.clone()));
    }
    EntityDetail {
        kind: "table".into(),
        name: db.table_full_name(id),
        properties,
    }
}

fn column_detail(db: &Database, id: ColumnId) -> EntityDetail {
    let column = db.column(id);
    let mut properties = vec![
        ("type".to_string(), column.column_type.sql()),
        ("catalog name".to_string(), db.column_catalog_name(id)),
        ("nullable".to_string(), column.nullable.to_string()),
        ("primary key".to_string(), db.is_primary_key(id).to_string()),
        ("serial".to_string(), column.is_serial().to_string()),
    ];
    if let Some(default) = &column.default {
        properties.push(("default".to_string(), default.value.clone()));
    }
    if let Some(labels) = &column.enum_labels {
        properties.push(("enum labels".to_string(), labels.join(", ")));
    }
    let referenced = db
        .referenced_columns(id)
        .into_iter()
        .map(|c| db.column_full_name(c))
        .collect::<Vec<_>>();
    if !referenced.is_empty() {
        properties.push(("references".to_string(), referenced.join(", ")));
    }
    let indexes = db
        .column_indexes(id)
        .into_iter()
        .map(|i| db.index(i).name.clone())
        .collect::<Vec<_>>();
    if !indexes.is_empty() {
        properties.push(("indexes".to_string(), indexes.join(", ")));
    }
    EntityDetail {
        kind: "column".into(),
        name: db.column_full_name(id),
        properties,
    }
}
