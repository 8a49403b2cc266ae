//! Flat catalog rows, one struct per ingest batch.

use serde::{Deserialize, Deserializer, Serialize};

/// A table and one of its columns.
///
/// The first row seen for a table supplies its kind, comment and annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRow {
    /// Catalog (database) the row was read from.
    pub catalog_name: Option<String>,
    /// Schema name.
    pub schema_name: String,
    /// Table name.
    pub table_name: String,
    /// Catalog table type such as `BASE TABLE` or `VIEW`.
    pub table_type: Option<String>,
    /// Table comment.
    pub table_comment: Option<String>,
    /// Structured table annotations.
    pub table_annotations: Option<serde_json::Value>,
    /// Column name.
    pub column_name: String,
    /// Position of the column within its table.
    pub ordinal_position: u32,
    /// Type descriptor, e.g. `numeric(10,2)[]`.
    pub data_type: String,
    /// Character length limit.
    pub length: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Schema of the column's domain.
    pub domain_schema: Option<String>,
    /// Name of the column's domain.
    pub domain_name: Option<String>,
    /// Underlying user-defined type.
    pub user_defined_type: Option<String>,
    /// Whether nulls are allowed.
    #[serde(deserialize_with = "yes_no", default = "default_true")]
    pub is_nullable: bool,
    /// Default expression, type cast included.
    pub column_default: Option<String>,
    /// Enum labels as one brace-wrapped token, e.g. `{a,"b,c"}`.
    pub enum_labels: Option<String>,
    /// Column comment.
    pub column_comment: Option<String>,
}

/// One key column of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexRow {
    /// Catalog (database) the row was read from.
    pub catalog_name: Option<String>,
    /// Schema name.
    pub schema_name: String,
    /// Table name.
    pub table_name: String,
    /// Index name.
    pub index_name: String,
    /// Key column.
    pub column_name: String,
    /// Position of the column within the key.
    pub ordinal_position: u32,
    /// Whether the index enforces uniqueness.
    #[serde(deserialize_with = "yes_no")]
    pub is_unique: bool,
    /// Whether the index backs the primary key.
    #[serde(deserialize_with = "yes_no")]
    pub is_primary_key: bool,
}

/// One key column of a constraint.
///
/// Check constraints without columns arrive as a single row with an empty
/// `column_name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintRow {
    /// Catalog (database) the row was read from.
    pub catalog_name: Option<String>,
    /// Schema name.
    pub schema_name: String,
    /// Table name.
    pub table_name: String,
    /// Constraint name.
    pub constraint_name: String,
    /// Catalog constraint type such as `FOREIGN KEY`.
    pub constraint_type: String,
    /// Key column.
    pub column_name: String,
    /// Position of the column within the key.
    pub ordinal_position: u32,
    /// Referenced schema, foreign keys only.
    pub referenced_schema: Option<String>,
    /// Referenced table, foreign keys only.
    pub referenced_table: Option<String>,
    /// Referenced column paired with `column_name`, foreign keys only.
    pub referenced_column: Option<String>,
    /// Match option.
    pub match_option: Option<String>,
    /// Update rule.
    pub update_rule: Option<String>,
    /// Delete rule.
    pub delete_rule: Option<String>,
    /// Check expression.
    pub check_clause: Option<String>,
    /// Constraint comment.
    pub constraint_comment: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Accept `true`/`false` or the catalog's `YES`/`NO` spelling.
fn yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim().to_ascii_uppercase().as_str() {
            "YES" | "Y" | "TRUE" | "T" => Ok(true),
            "NO" | "N" | "FALSE" | "F" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected YES or NO, found `{other}`"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_row_accepts_yes_no() {
        let row: ColumnRow = serde_json::from_value(serde_json::json!({
            "schema_name": "public",
            "table_name": "account",
            "column_name": "name",
            "ordinal_position": 2,
            "data_type": "character varying(20)",
            "is_nullable": "NO"
        }))
        .unwrap();
        assert!(!row.is_nullable);
        assert_eq!(row.data_type, "character varying(20)");
    }

    #[test]
    fn test_nullable_defaults_to_true() {
        let row: ColumnRow = serde_json::from_value(serde_json::json!({
            "schema_name": "public",
            "table_name": "account",
            "column_name": "name",
            "data_type": "text"
        }))
        .unwrap();
        assert!(row.is_nullable);
    }

    #[test]
    fn test_index_row_bool_flags() {
        let row: IndexRow = serde_json::from_value(serde_json::json!({
            "schema_name": "public",
            "table_name": "account",
            "index_name": "account_pkey",
            "column_name": "id",
            "ordinal_position": 1,
            "is_unique": true,
            "is_primary_key": "yes"
        }))
        .unwrap();
        assert!(row.is_unique && row.is_primary_key);
    }

    #[test]
    fn test_bad_flag_is_rejected() {
        let result: Result<IndexRow, _> = serde_json::from_value(serde_json::json!({
            "index_name": "x",
            "is_unique": "maybe"
        }));
        assert!(result.is_err());
    }
}
