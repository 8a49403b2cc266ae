//! Catalog entities: schemas, tables, columns, constraints and indexes.

use super::ids::{ColumnId, ConstraintId, IndexId, SchemaId, TableId};
use crate::cache::Version;
use crate::graph::derived::TableCache;
use std::collections::{BTreeMap, HashMap};

/// Kind of relation-like object a [`Table`] represents.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub enum TableKind {
    /// Ordinary base table.
    #[default]
    Table,
    /// View.
    View,
    /// Materialized view.
    MaterializedView,
    /// Foreign table.
    ForeignTable,
}

impl TableKind {
    /// Parse a catalog table type such as `BASE TABLE` or `VIEW`.
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BASE TABLE" | "TABLE" | "R" | "P" => Some(TableKind::Table),
            "VIEW" | "V" => Some(TableKind::View),
            "MATERIALIZED VIEW" | "M" => Some(TableKind::MaterializedView),
            "FOREIGN TABLE" | "FOREIGN" | "F" => Some(TableKind::ForeignTable),
            _ => None,
        }
    }
}

/// Kind of a [`Constraint`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub enum ConstraintKind {
    /// Primary key.
    PrimaryKey,
    /// Foreign key.
    ForeignKey,
    /// Unique key.
    Unique,
    /// Check constraint.
    Check,
}

impl ConstraintKind {
    /// Parse a catalog constraint type such as `FOREIGN KEY`.
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRIMARY KEY" | "P" => Some(ConstraintKind::PrimaryKey),
            "FOREIGN KEY" | "F" => Some(ConstraintKind::ForeignKey),
            "UNIQUE" | "U" => Some(ConstraintKind::Unique),
            "CHECK" | "C" => Some(ConstraintKind::Check),
            _ => None,
        }
    }
}

/// Referential action of a foreign key on update or delete.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub enum ReferentialAction {
    /// Propagate the change to referencing rows.
    Cascade,
    /// Set referencing columns to null.
    SetNull,
    /// Set referencing columns to their defaults.
    SetDefault,
    /// Reject the change immediately.
    Restrict,
    /// Reject the change when the constraint is checked.
    NoAction,
}

impl ReferentialAction {
    /// Parse a catalog rule such as `SET NULL`.
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" => Some(ReferentialAction::SetDefault),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "NO ACTION" => Some(ReferentialAction::NoAction),
            _ => None,
        }
    }

    /// SQL spelling of the action.
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// Schema-qualified name of a domain or type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// Schema name.
    pub schema: String,
    /// Object name.
    pub name: String,
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Data type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnType {
    /// Base type; the element type for arrays, the underlying type for domains.
    pub base: String,
    /// Number of array dimensions, 0 for scalars.
    pub array_dimension: u8,
    /// Character length limit.
    pub length: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Domain the column is declared with, if any.
    pub domain: Option<QualifiedName>,
    /// Underlying user-defined type name (enums, composites).
    pub user_defined_type: Option<String>,
}

impl ColumnType {
    /// Scalar type with no modifiers.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    /// Whether the column holds arrays.
    pub fn is_array(&self) -> bool {
        self.array_dimension > 0
    }

    /// Element type when the column is an array.
    pub fn array_type(&self) -> Option<&str> {
        self.is_array().then_some(self.base.as_str())
    }

    /// SQL rendering, e.g. `numeric(10,2)[]`.
    pub fn sql(&self) -> String {
        let mut out = self.base.clone();
        match (self.length, self.precision, self.scale) {
            (Some(length), _, _) => out.push_str(&format!("({length})")),
            (None, Some(precision), Some(scale)) => {
                out.push_str(&format!("({precision},{scale})"))
            }
            (None, Some(precision), None) => out.push_str(&format!("({precision})")),
            _ => {}
        }
        for _ in 0..self.array_dimension {
            out.push_str("[]");
        }
        out
    }
}

/// Column default expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultValue {
    /// Expression as reported by the catalog, type cast included.
    pub raw: String,
    /// Expression with a trailing type cast removed.
    pub value: String,
}

/// A schema and the tables it owns.
#[derive(Debug)]
pub struct Schema {
    /// Identifier.
    pub id: SchemaId,
    /// Schema name.
    pub name: String,
    pub(crate) tables: BTreeMap<String, TableId>,
}

impl Schema {
    pub(crate) fn new(id: SchemaId, name: String) -> Self {
        Self {
            id,
            name,
            tables: BTreeMap::new(),
        }
    }

    /// Table identifiers in name order.
    pub fn table_ids(&self) -> impl Iterator<Item = TableId> + '_ {
        self.tables.values().copied()
    }

    /// Table identifier by name.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables.get(name).copied()
    }
}

/// Version counters of a table's child collections.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableVersions {
    /// Bumped on every column append.
    pub columns: Version,
    /// Bumped on every constraint append.
    pub constraints: Version,
    /// Bumped on every index append.
    pub indexes: Version,
}

/// A table (or view) with its columns, constraints and indexes.
#[derive(Debug)]
pub struct Table {
    /// Identifier.
    pub id: TableId,
    /// Owning schema.
    pub schema: SchemaId,
    /// Table name.
    pub name: String,
    /// Object kind.
    pub kind: TableKind,
    /// Catalog comment.
    pub comment: Option<String>,
    /// Structured annotation data attached to the table, `Null` when absent.
    pub annotations: serde_json::Value,
    pub(crate) columns: Vec<ColumnId>,
    pub(crate) column_names: HashMap<String, ColumnId>,
    pub(crate) constraints: BTreeMap<String, ConstraintId>,
    pub(crate) indexes: BTreeMap<String, IndexId>,
    pub(crate) versions: TableVersions,
    pub(crate) cache: TableCache,
}

impl Table {
    /// Column identifiers in definition order.
    pub fn column_ids(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Column identifier by name.
    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.column_names.get(name).copied()
    }

    /// Constraint identifiers in name order.
    pub fn constraint_ids(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraints.values().copied()
    }

    /// Constraint identifier by name.
    pub fn constraint_id(&self, name: &str) -> Option<ConstraintId> {
        self.constraints.get(name).copied()
    }

    /// Index identifiers in name order.
    pub fn index_ids(&self) -> impl Iterator<Item = IndexId> + '_ {
        self.indexes.values().copied()
    }

    /// Index identifier by name.
    pub fn index_id(&self, name: &str) -> Option<IndexId> {
        self.indexes.get(name).copied()
    }

    /// Current child collection versions.
    pub fn versions(&self) -> TableVersions {
        self.versions
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Identifier.
    pub id: ColumnId,
    /// Owning table.
    pub table: TableId,
    /// Column name.
    pub name: String,
    /// Ordinal position within the table (1-based in catalogs).
    pub ordinal: u32,
    /// Data type.
    pub column_type: ColumnType,
    /// Default expression.
    pub default: Option<DefaultValue>,
    /// Whether nulls are allowed.
    pub nullable: bool,
    /// Enum labels, `None` unless the column is enumerated.
    pub enum_labels: Option<Vec<String>>,
    /// Catalog comment.
    pub comment: Option<String>,
}

impl Column {
    /// Whether nulls are rejected.
    pub fn not_null(&self) -> bool {
        !self.nullable
    }

    /// Whether the column is filled from a sequence.
    pub fn is_serial(&self) -> bool {
        let serial_type = matches!(
            self.column_type.base.as_str(),
            "serial" | "bigserial" | "smallserial"
        );
        let sequence_default = self
            .default
            .as_ref()
            .is_some_and(|d| d.raw.trim_start().starts_with("nextval("));
        serial_type || sequence_default
    }
}

/// A table constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Identifier.
    pub id: ConstraintId,
    /// Owning table (the child side for foreign keys).
    pub table: TableId,
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Key columns in ordinal order.
    pub columns: Vec<ColumnId>,
    /// Referenced table for foreign keys.
    pub referenced_table: Option<TableId>,
    /// Referenced columns, pairwise with `columns`.
    pub referenced_columns: Vec<ColumnId>,
    /// Foreign key match option (`SIMPLE`, `FULL`, `PARTIAL`).
    pub match_option: Option<String>,
    /// Foreign key update rule.
    pub on_update: Option<ReferentialAction>,
    /// Foreign key delete rule.
    pub on_delete: Option<ReferentialAction>,
    /// Check expression.
    pub check_clause: Option<String>,
    /// Catalog comment.
    pub comment: Option<String>,
}

impl Constraint {
    /// Whether this is a foreign key.
    pub fn is_foreign_key(&self) -> bool {
        self.kind == ConstraintKind::ForeignKey
    }

    /// Whether this is a primary key.
    pub fn is_primary_key(&self) -> bool {
        self.kind == ConstraintKind::PrimaryKey
    }

    /// Local column to referenced column pairs.
    pub fn referenced_columns_by(&self) -> impl Iterator<Item = (ColumnId, ColumnId)> + '_ {
        self.columns
            .iter()
            .copied()
            .zip(self.referenced_columns.iter().copied())
    }
}

/// A table index.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Identifier.
    pub id: IndexId,
    /// Owning table.
    pub table: TableId,
    /// Index name.
    pub name: String,
    /// Key columns in ordinal order.
    pub columns: Vec<ColumnId>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Whether the index backs the primary key.
    pub primary_key: bool,
}

/// Attributes of a table to create.
#[derive(Debug, Clone, Default)]
pub struct NewTable {
    /// Table name.
    pub name: String,
    /// Object kind.
    pub kind: TableKind,
    /// Catalog comment.
    pub comment: Option<String>,
    /// Structured annotation data.
    pub annotations: serde_json::Value,
}

impl NewTable {
    /// A base table with no comment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the object kind.
    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the annotation data.
    pub fn with_annotations(mut self, annotations: serde_json::Value) -> Self {
        self.annotations = annotations;
        self
    }
}

/// Attributes of a column to create.
#[derive(Debug, Clone)]
pub struct NewColumn {
    /// Column name.
    pub name: String,
    /// Ordinal position.
    pub ordinal: u32,
    /// Data type.
    pub column_type: ColumnType,
    /// Default expression.
    pub default: Option<DefaultValue>,
    /// Whether nulls are allowed.
    pub nullable: bool,
    /// Enum labels.
    pub enum_labels: Option<Vec<String>>,
    /// Catalog comment.
    pub comment: Option<String>,
}

impl NewColumn {
    /// A nullable column without default.
    pub fn new(name: impl Into<String>, ordinal: u32, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            ordinal,
            column_type,
            default: None,
            nullable: true,
            enum_labels: None,
            comment: None,
        }
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default expression.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Set enum labels.
    pub fn with_enum_labels(mut self, labels: Vec<String>) -> Self {
        self.enum_labels = Some(labels);
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Referenced side of a foreign key to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
    /// Referenced schema.
    pub schema: String,
    /// Referenced table.
    pub table: String,
    /// Referenced columns, pairwise with the constraint's columns.
    pub columns: Vec<String>,
}

/// Attributes of a constraint to create. Columns are given by name.
#[derive(Debug, Clone)]
pub struct NewConstraint {
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Key column names in ordinal order.
    pub columns: Vec<String>,
    /// Referenced table and columns for foreign keys.
    pub references: Option<ForeignKeyTarget>,
    /// Match option.
    pub match_option: Option<String>,
    /// Update rule.
    pub on_update: Option<ReferentialAction>,
    /// Delete rule.
    pub on_delete: Option<ReferentialAction>,
    /// Check expression.
    pub check_clause: Option<String>,
    /// Catalog comment.
    pub comment: Option<String>,
}

impl NewConstraint {
    fn base(name: impl Into<String>, kind: ConstraintKind, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
            references: None,
            match_option: None,
            on_update: None,
            on_delete: None,
            check_clause: None,
            comment: None,
        }
    }

    /// Primary key over `columns`.
    pub fn primary_key(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::base(
            name,
            ConstraintKind::PrimaryKey,
            columns.into_iter().map(Into::into).collect(),
        )
    }

    /// Unique key over `columns`.
    pub fn unique(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::base(
            name,
            ConstraintKind::Unique,
            columns.into_iter().map(Into::into).collect(),
        )
    }

    /// Foreign key from `columns` to `schema.table(referenced)`.
    pub fn foreign_key(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        schema: impl Into<String>,
        table: impl Into<String>,
        referenced: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut constraint = Self::base(
            name,
            ConstraintKind::ForeignKey,
            columns.into_iter().map(Into::into).collect(),
        );
        constraint.references = Some(ForeignKeyTarget {
            schema: schema.into(),
            table: table.into(),
            columns: referenced.into_iter().map(Into::into).collect(),
        });
        constraint
    }

    /// Check constraint over `columns`.
    pub fn check(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        clause: impl Into<String>,
    ) -> Self {
        let mut constraint = Self::base(
            name,
            ConstraintKind::Check,
            columns.into_iter().map(Into::into).collect(),
        );
        constraint.check_clause = Some(clause.into());
        constraint
    }

    /// Set update and delete rules.
    pub fn with_rules(
        mut self,
        on_update: Option<ReferentialAction>,
        on_delete: Option<ReferentialAction>,
    ) -> Self {
        self.on_update = on_update;
        self.on_delete = on_delete;
        self
    }

    /// Set the match option.
    pub fn with_match_option(mut self, option: impl Into<String>) -> Self {
        self.match_option = Some(option.into());
        self
    }
}

/// Attributes of an index to create. Columns are given by name.
#[derive(Debug, Clone)]
pub struct NewIndex {
    /// Index name.
    pub name: String,
    /// Key column names in ordinal order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Whether the index backs the primary key.
    pub primary_key: bool,
}

impl NewIndex {
    /// Non-unique index over `columns`.
    pub fn new(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            primary_key: false,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the index as the primary key index (implies unique).
    pub fn primary_key(mut self) -> Self {
        self.unique = true;
        self.primary_key = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_enums() {
        assert_eq!(TableKind::from_catalog("BASE TABLE"), Some(TableKind::Table));
        assert_eq!(
            TableKind::from_catalog("materialized view"),
            Some(TableKind::MaterializedView)
        );
        assert_eq!(
            ConstraintKind::from_catalog("FOREIGN KEY"),
            Some(ConstraintKind::ForeignKey)
        );
        assert_eq!(ConstraintKind::from_catalog("EXCLUDE"), None);
        assert_eq!(
            ReferentialAction::from_catalog("set null"),
            Some(ReferentialAction::SetNull)
        );
        assert_eq!(ReferentialAction::NoAction.as_sql(), "NO ACTION");
    }

    #[test]
    fn test_column_type_sql() {
        let mut numeric = ColumnType::new("numeric");
        numeric.precision = Some(10);
        numeric.scale = Some(2);
        numeric.array_dimension = 1;
        assert_eq!(numeric.sql(), "numeric(10,2)[]");
        assert_eq!(numeric.array_type(), Some("numeric"));

        let mut varchar = ColumnType::new("character varying");
        varchar.length = Some(20);
        assert_eq!(varchar.sql(), "character varying(20)");
        assert!(varchar.array_type().is_none());
    }

    #[test]
    fn test_serial_detection() {
        let id = Column {
            id: ColumnId::from_index(0).unwrap(),
            table: TableId::from_index(0).unwrap(),
            name: "id".into(),
            ordinal: 1,
            column_type: ColumnType::new("integer"),
            default: Some(DefaultValue {
                raw: "nextval('account_id_seq'::regclass)".into(),
                value: "nextval('account_id_seq'::regclass)".into(),
            }),
            nullable: false,
            enum_labels: None,
            comment: None,
        };
        assert!(id.is_serial());
        assert!(id.not_null());

        let plain = Column {
            default: None,
            column_type: ColumnType::new("text"),
            ..id.clone()
        };
        assert!(!plain.is_serial());
    }

    #[test]
    fn test_new_index_primary_key_implies_unique() {
        let index = NewIndex::new("account_pkey", ["id"]).primary_key();
        assert!(index.unique);
        assert!(index.primary_key);
    }
}
