//! Version-tagged snapshots of a database graph.
//!
//! Only entities are persisted. Derived collections and relations are
//! recomputed lazily after restore.

mod codec;
mod format;

pub use codec::{deserialize, load, save, serialize, Encoding, MAGIC};
pub use format::{
    ColumnRecord, ConstraintRecord, FormatVersion, IndexRecord, SchemaRecord, Snapshot,
    TableRecord,
};
