//! CLI error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the graph library.
    #[error(transparent)]
    Core(#[from] schemagraph_core::Error),

    /// The snapshot was written by an incompatible format version.
    #[error("snapshot `{}` uses an unsupported format version; rebuild it from the catalog", .0.display())]
    UnsupportedSnapshot(PathBuf),

    /// A table argument did not name a table.
    #[error("table `{0}` not found")]
    TableNotFound(String),

    /// A table argument was not of the form `schema.table`.
    #[error("expected `schema.table`, got `{0}`")]
    InvalidTableName(String),
}
