//! Dotted-path lookup: `schema`, `schema.table`, `schema.table.column`.
//!
//! Segments may be double-quoted to contain dots (`"my.schema".orders`); a doubled
//! quote inside a quoted segment stands for one quote character.

use super::database::Database;
use super::ids::{ColumnId, SchemaId, TableId};
use crate::error::{Error, Result};

/// Entity found by [`Database::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    /// A schema.
    Schema(SchemaId),
    /// A table.
    Table(TableId),
    /// A column.
    Column(ColumnId),
}

impl Database {
    /// Resolve a dotted path from the database root.
    ///
    /// Returns `Ok(None)` when any segment names nothing; only a malformed path
    /// is an error.
    pub fn get(&self, path: &str) -> Result<Option<EntityRef>> {
        let segments = split_path(path)?;
        if segments.len() > 3 {
            return Err(malformed(path, "at most three segments are allowed"));
        }

        let Some(schema) = self.schema(&segments[0]) else {
            return Ok(None);
        };
        let Some(table_name) = segments.get(1) else {
            return Ok(Some(EntityRef::Schema(schema.id)));
        };
        Ok(self.resolve_in_schema(schema.id, table_name, segments.get(2)))
    }

    /// Resolve `table` or `table.column` relative to a schema.
    pub fn get_in_schema(&self, schema: SchemaId, path: &str) -> Result<Option<EntityRef>> {
        let segments = split_path(path)?;
        if segments.len() > 2 {
            return Err(malformed(path, "at most two segments are allowed below a schema"));
        }
        Ok(self.resolve_in_schema(schema, &segments[0], segments.get(1)))
    }

    fn resolve_in_schema(
        &self,
        schema: SchemaId,
        table: &str,
        column: Option<&String>,
    ) -> Option<EntityRef> {
        let table = self.schema_by_id(schema).table_id(table)?;
        match column {
            None => Some(EntityRef::Table(table)),
            Some(column) => self.table(table).column_id(column).map(EntityRef::Column),
        }
    }
}

fn malformed(path: &str, reason: &str) -> Error {
    Error::Lookup {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn split_path(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Err(malformed(path, "path is empty"));
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            ('"', true) => quoted = false,
            ('"', false) if current.is_empty() && !was_quoted => {
                quoted = true;
                was_quoted = true;
            }
            ('"', false) => return Err(malformed(path, "unexpected quote inside a segment")),
            ('.', false) => {
                if current.is_empty() && !was_quoted {
                    return Err(malformed(path, "empty segment"));
                }
                segments.push(std::mem::take(&mut current));
                was_quoted = false;
            }
            (c, _) => {
                if was_quoted && !quoted {
                    return Err(malformed(path, "text after closing quote"));
                }
                current.push(c);
            }
        }
    }

    if quoted {
        return Err(malformed(path, "unterminated quote"));
    }
    if current.is_empty() && !was_quoted {
        return Err(malformed(path, "empty segment"));
    }
    segments.push(current);
    Ok(segments)
}
