//! Core error types.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of catalog entity named in a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A schema.
    Schema,
    /// A table, view or other relation-like object.
    Table,
    /// A table column.
    Column,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Schema => write!(f, "schema"),
            EntityKind::Table => write!(f, "table"),
            EntityKind::Column => write!(f, "column"),
        }
    }
}

/// Core graph errors.
#[derive(Debug, Error)]
pub enum Error {
    /// An ingest row references an entity absent from the graph.
    #[error("cannot resolve {kind} `{name}` referenced by {context}")]
    Resolution {
        /// What kind of entity was missing.
        kind: EntityKind,
        /// Qualified name that failed to resolve.
        name: String,
        /// The row or entity that held the reference.
        context: String,
    },

    /// A mutation was attempted after the graph was frozen.
    #[error("database `{database}` is frozen and cannot be modified")]
    FrozenGraph {
        /// Name of the frozen database.
        database: String,
    },

    /// A dotted lookup path could not be parsed.
    #[error("malformed lookup path `{path}`: {reason}")]
    Lookup {
        /// The path as given.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A row batch was pushed after a later batch had already started.
    #[error("{found} rows received after {expected} rows; batches must arrive in order")]
    PassOrder {
        /// The pass that is already in progress.
        expected: &'static str,
        /// The pass the rejected row belongs to.
        found: &'static str,
    },

    /// A constraint violates a structural invariant of the graph.
    #[error("invalid constraint `{name}`: {reason}")]
    InvalidConstraint {
        /// Constraint name.
        name: String,
        /// Violated invariant.
        reason: String,
    },

    /// An arena ran out of 32-bit identifiers.
    #[error("{arena} arena is full")]
    ArenaFull {
        /// Arena that overflowed.
        arena: &'static str,
    },

    /// The ingest builder was used after an earlier row failed.
    #[error("ingest was aborted by an earlier error")]
    IngestAborted,

    /// Snapshot encoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Snapshot decoding failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Filesystem error while saving or loading a snapshot.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

