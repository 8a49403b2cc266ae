//! Flattened snapshot records.
//!
//! Every entity becomes one record carrying its arena index as local identifier;
//! parent back-references and foreign-key targets are identifiers, never nested
//! copies. Relations are not part of a snapshot.

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::{
    ColumnId, ColumnType, ConstraintKind, Database, DefaultValue, NewColumn, NewConstraint,
    NewIndex, NewTable, QualifiedName, ReferentialAction, TableId, TableKind,
};
use rkyv::{Archive, Deserialize, Serialize};

/// Snapshot format version.
///
/// Readers accept any minor version of the major version they support.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct FormatVersion {
    /// Incompatible layout changes.
    pub major: u16,
    /// Backward compatible additions.
    pub minor: u16,
}

impl FormatVersion {
    /// The version this build writes and reads.
    pub const CURRENT: FormatVersion = FormatVersion { major: 1, minor: 0 };

    /// Whether a snapshot written with `self` can be read by this build.
    pub fn is_supported(self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Schema record.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct SchemaRecord {
    pub id: u32,
    pub name: String,
}

/// Table record. Annotations are kept as JSON text.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct TableRecord {
    pub id: u32,
    pub schema: u32,
    pub name: String,
    pub kind: TableKind,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub annotations: Option<String>,
}

/// Column record.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct ColumnRecord {
    pub id: u32,
    pub table: u32,
    pub name: String,
    pub ordinal: u32,
    pub base_type: String,
    #[serde(default)]
    pub array_dimension: u8,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub domain: Option<(String, String)>,
    #[serde(default)]
    pub user_defined_type: Option<String>,
    #[serde(default)]
    pub default: Option<(String, String)>,
    pub nullable: bool,
    #[serde(default)]
    pub enum_labels: Option<Vec<String>>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Constraint record.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct ConstraintRecord {
    pub id: u32,
    pub table: u32,
    pub name: String,
    pub kind: ConstraintKind,
    pub columns: Vec<u32>,
    #[serde(default)]
    pub referenced_table: Option<u32>,
    #[serde(default)]
    pub referenced_columns: Vec<u32>,
    #[serde(default)]
    pub match_option: Option<String>,
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default)]
    pub check_clause: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Index record.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct IndexRecord {
    pub id: u32,
    pub table: u32,
    pub name: String,
    pub columns: Vec<u32>,
    pub unique: bool,
    pub primary_key: bool,
}

/// A flattened database graph.
#[derive(
    Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Archive, Serialize, Deserialize,
)]
pub struct Snapshot {
    pub format: FormatVersion,
    pub database: String,
    #[serde(default)]
    pub catalog: Option<String>,
    pub schemas: Vec<SchemaRecord>,
    pub tables: Vec<TableRecord>,
    pub columns: Vec<ColumnRecord>,
    pub constraints: Vec<ConstraintRecord>,
    pub indexes: Vec<IndexRecord>,
}

fn raw(index: usize) -> Result<u32> {
    u32::try_from(index)
        .map_err(|_| Error::Serialization(format!("identifier {index} does not fit in 32 bits")))
}

fn raw_ids(ids: &[ColumnId]) -> Result<Vec<u32>> {
    ids.iter().map(|id| raw(id.index())).collect()
}

impl Snapshot {
    /// Flatten a database graph.
    pub fn capture(db: &Database) -> Result<Self> {
        let schemas = db
            .schemas
            .iter()
            .map(|s| {
                Ok(SchemaRecord {
                    id: raw(s.id.index())?,
                    name: s.name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tables = db
            .tables
            .iter()
            .map(|t| {
                let annotations = if t.annotations.is_null() {
                    None
                } else {
                    Some(
                        serde_json::to_string(&t.annotations)
                            .map_err(|e| Error::Serialization(e.to_string()))?,
                    )
                };
                Ok(TableRecord {
                    id: raw(t.id.index())?,
                    schema: raw(t.schema.index())?,
                    name: t.name.clone(),
                    kind: t.kind,
                    comment: t.comment.clone(),
                    annotations,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let columns = db
            .columns
            .iter()
            .map(|c| {
                Ok(ColumnRecord {
                    id: raw(c.id.index())?,
                    table: raw(c.table.index())?,
                    name: c.name.clone(),
                    ordinal: c.ordinal,
                    base_type: c.column_type.base.clone(),
                    array_dimension: c.column_type.array_dimension,
                    length: c.column_type.length,
                    precision: c.column_type.precision,
                    scale: c.column_type.scale,
                    domain: c
                        .column_type
                        .domain
                        .as_ref()
                        .map(|d| (d.schema.clone(), d.name.clone())),
                    user_defined_type: c.column_type.user_defined_type.clone(),
                    default: c.default.as_ref().map(|d| (d.raw.clone(), d.value.clone())),
                    nullable: c.nullable,
                    enum_labels: c.enum_labels.clone(),
                    comment: c.comment.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let constraints = db
            .constraints
            .iter()
            .map(|c| {
                Ok(ConstraintRecord {
                    id: raw(c.id.index())?,
                    table: raw(c.table.index())?,
                    name: c.name.clone(),
                    kind: c.kind,
                    columns: raw_ids(&c.columns)?,
                    referenced_table: c.referenced_table.map(|t| raw(t.index())).transpose()?,
                    referenced_columns: raw_ids(&c.referenced_columns)?,
                    match_option: c.match_option.clone(),
                    on_update: c.on_update,
                    on_delete: c.on_delete,
                    check_clause: c.check_clause.clone(),
                    comment: c.comment.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let indexes = db
            .indexes
            .iter()
            .map(|i| {
                Ok(IndexRecord {
                    id: raw(i.id.index())?,
                    table: raw(i.table.index())?,
                    name: i.name.clone(),
                    columns: raw_ids(&i.columns)?,
                    unique: i.unique,
                    primary_key: i.primary_key,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            format: FormatVersion::CURRENT,
            database: db.name().to_string(),
            catalog: db.catalog().map(str::to_string),
            schemas,
            tables,
            columns,
            constraints,
            indexes,
        })
    }

    /// Rebuild and freeze the graph.
    ///
    /// Records are replayed in identifier order through the graph's own mutation
    /// API, so every identifier must be dense and every link must resolve.
    pub fn restore(&self, config: GraphConfig) -> Result<Database> {
        let mut db = Database::new(self.database.clone(), config);
        if let Some(catalog) = &self.catalog {
            db.set_catalog(catalog)?;
        }

        for (position, record) in self.schemas.iter().enumerate() {
            dense("schema", position, record.id)?;
            let id = db.add_schema(&record.name)?;
            same("schema", record.id, id.index())?;
        }

        for (position, record) in self.tables.iter().enumerate() {
            dense("table", position, record.id)?;
            let schema = checked("schema", record.schema, db.schemas.len())?;
            let annotations = match &record.annotations {
                Some(text) => serde_json::from_str(text)
                    .map_err(|e| Error::Deserialization(e.to_string()))?,
                None => serde_json::Value::Null,
            };
            let mut table = NewTable::new(record.name.as_str())
                .with_kind(record.kind)
                .with_annotations(annotations);
            table.comment = record.comment.clone();
            let schema = db.schemas[schema].id;
            let id = db.add_table(schema, table)?;
            same("table", record.id, id.index())?;
        }

        for (position, record) in self.columns.iter().enumerate() {
            dense("column", position, record.id)?;
            let table = table_id(&db, record.table)?;
            let column_type = ColumnType {
                base: record.base_type.clone(),
                array_dimension: record.array_dimension,
                length: record.length,
                precision: record.precision,
                scale: record.scale,
                domain: record.domain.as_ref().map(|(schema, name)| QualifiedName {
                    schema: schema.clone(),
                    name: name.clone(),
                }),
                user_defined_type: record.user_defined_type.clone(),
            };
            let mut column = NewColumn::new(record.name.as_str(), record.ordinal, column_type);
            column.nullable = record.nullable;
            column.default = record.default.as_ref().map(|(raw, value)| DefaultValue {
                raw: raw.clone(),
                value: value.clone(),
            });
            column.enum_labels = record.enum_labels.clone();
            column.comment = record.comment.clone();
            let id = db.add_column(table, column)?;
            same("column", record.id, id.index())?;
        }

        for (position, record) in self.indexes.iter().enumerate() {
            dense("index", position, record.id)?;
            let table = table_id(&db, record.table)?;
            let columns = column_names(&db, table, &record.columns)?;
            let mut index = NewIndex::new(record.name.as_str(), columns);
            index.unique = record.unique;
            index.primary_key = record.primary_key;
            let id = db.add_index(table, index)?;
            same("index", record.id, id.index())?;
        }

        for (position, record) in self.constraints.iter().enumerate() {
            dense("constraint", position, record.id)?;
            let table = table_id(&db, record.table)?;
            let columns = column_names(&db, table, &record.columns)?;
            let mut constraint = match record.kind {
                ConstraintKind::PrimaryKey => {
                    NewConstraint::primary_key(record.name.as_str(), columns)
                }
                ConstraintKind::Unique => NewConstraint::unique(record.name.as_str(), columns),
                ConstraintKind::Check => NewConstraint::check(
                    record.name.as_str(),
                    columns,
                    record.check_clause.clone().unwrap_or_default(),
                ),
                ConstraintKind::ForeignKey => {
                    let target = record.referenced_table.ok_or_else(|| {
                        Error::Deserialization(format!(
                            "foreign key `{}` has no referenced table",
                            record.name
                        ))
                    })?;
                    let target = table_id(&db, target)?;
                    let referenced = column_names(&db, target, &record.referenced_columns)?;
                    let target_table = db.table(target);
                    let target_schema = db.schema_by_id(target_table.schema).name.clone();
                    NewConstraint::foreign_key(
                        record.name.as_str(),
                        columns,
                        target_schema,
                        target_table.name.clone(),
                        referenced,
                    )
                    .with_rules(record.on_update, record.on_delete)
                }
            };
            constraint.check_clause = record.check_clause.clone();
            constraint.match_option = record.match_option.clone();
            constraint.comment = record.comment.clone();
            let id = db.add_constraint(table, constraint)?;
            same("constraint", record.id, id.index())?;
        }

        db.freeze()?;
        Ok(db)
    }
}

fn dense(kind: &str, position: usize, id: u32) -> Result<()> {
    if id as usize != position {
        return Err(Error::Deserialization(format!(
            "{kind} identifiers are not dense: expected {position}, found {id}"
        )));
    }
    Ok(())
}

fn same(kind: &str, expected: u32, actual: usize) -> Result<()> {
    if expected as usize != actual {
        return Err(Error::Deserialization(format!(
            "duplicate {kind} record {expected}"
        )));
    }
    Ok(())
}

fn checked(kind: &str, id: u32, len: usize) -> Result<usize> {
    let index = id as usize;
    if index >= len {
        return Err(Error::Deserialization(format!(
            "dangling {kind} link {id}"
        )));
    }
    Ok(index)
}

fn table_id(db: &Database, id: u32) -> Result<TableId> {
    let index = checked("table", id, db.tables.len())?;
    Ok(db.tables[index].id)
}

fn column_names(db: &Database, table: TableId, ids: &[u32]) -> Result<Vec<String>> {
    ids.iter()
        .map(|&id| {
            let index = checked("column", id, db.columns.len())?;
            let column = &db.columns[index];
            if column.table != table {
                return Err(Error::Deserialization(format!(
                    "column {id} does not belong to {}",
                    db.table_full_name(table)
                )));
            }
            Ok(column.name.clone())
        })
        .collect()
}
