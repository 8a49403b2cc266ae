//! Catalog data sources.

use super::builder::CatalogIngest;
use super::rows::{ColumnRow, ConstraintRow, IndexRow};
use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::Database;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

/// Something that can push the three catalog batches into an ingest.
///
/// Implementations deliver every column row, then every index row, then every
/// constraint row, and stop at the first error.
pub trait CatalogSource {
    /// Push all rows into `ingest`.
    fn push_rows(&self, ingest: &mut CatalogIngest) -> Result<()>;
}

/// The three catalog batches held in memory, e.g. from a JSON dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRows {
    /// Table and column rows.
    pub columns: Vec<ColumnRow>,
    /// Index key rows.
    pub indexes: Vec<IndexRow>,
    /// Constraint key rows.
    pub constraints: Vec<ConstraintRow>,
}

impl CatalogRows {
    /// Parse a JSON document with `columns`, `indexes` and `constraints` arrays.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Read a JSON dump from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// Total number of rows across all batches.
    pub fn len(&self) -> usize {
        self.columns.len() + self.indexes.len() + self.constraints.len()
    }

    /// Whether there are no rows at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CatalogSource for CatalogRows {
    fn push_rows(&self, ingest: &mut CatalogIngest) -> Result<()> {
        for row in &self.columns {
            ingest.push_column_row(row.clone())?;
        }
        for row in &self.indexes {
            ingest.push_index_row(row.clone())?;
        }
        for row in &self.constraints {
            ingest.push_constraint_row(row.clone())?;
        }
        Ok(())
    }
}

/// Build and freeze a database graph from `source`.
#[instrument(skip(source, config))]
pub fn ingest<S: CatalogSource + ?Sized>(
    source: &S,
    name: &str,
    config: GraphConfig,
) -> Result<Database> {
    let mut ingest = CatalogIngest::new(name, config);
    source.push_rows(&mut ingest)?;
    let db = ingest.finish()?;
    info!(
        schemas = db.schemas().count(),
        tables = db.table_count(),
        "Database graph built"
    );
    Ok(db)
}
