//! Snapshot encodings and file persistence.
//!
//! Binary layout:
//!
//! ```text
//! +--------+-------+-------+----------------+----------------+
//! | "SGRF" | major | minor | blake3(payload)| rkyv payload   |
//! | 4 B    | u16 LE| u16 LE| 32 B           | ...            |
//! +--------+-------+-------+----------------+----------------+
//! ```
//!
//! JSON snapshots are a single object whose `format` member carries the version.

use super::format::{FormatVersion, Snapshot};
use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::Database;
use rkyv::util::AlignedVec;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Leading bytes of a binary snapshot.
pub const MAGIC: &[u8; 4] = b"SGRF";

const HEADER_LEN: usize = 4 + 2 + 2 + 32;

/// Snapshot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Versioned, checksummed rkyv archive.
    #[default]
    Binary,
    /// Self-describing JSON document.
    Json,
}

impl Encoding {
    /// JSON for `.json` paths, binary otherwise.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Encoding::Json,
            _ => Encoding::Binary,
        }
    }

    /// Guess the encoding of a blob from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(MAGIC) {
            Encoding::Binary
        } else {
            Encoding::Json
        }
    }
}

/// Encode a database graph.
#[instrument(skip(db), fields(database = %db.name()))]
pub fn serialize(db: &Database, encoding: Encoding) -> Result<Vec<u8>> {
    let snapshot = Snapshot::capture(db)?;
    let bytes = match encoding {
        Encoding::Json => {
            serde_json::to_vec(&snapshot).map_err(|e| Error::Serialization(e.to_string()))?
        }
        Encoding::Binary => {
            let payload = rkyv::to_bytes::<rkyv::rancor::Error>(&snapshot)
                .map_err(|e| Error::Serialization(e.to_string()))?;
            let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
            out.extend_from_slice(MAGIC);
            out.extend_from_slice(&snapshot.format.major.to_le_bytes());
            out.extend_from_slice(&snapshot.format.minor.to_le_bytes());
            out.extend_from_slice(blake3::hash(&payload).as_bytes());
            out.extend_from_slice(&payload);
            out
        }
    };
    debug!(bytes = bytes.len(), ?encoding, "Snapshot encoded");
    Ok(bytes)
}

/// Decode a snapshot and rebuild a frozen graph.
///
/// Returns `Ok(None)` when the snapshot was written by an incompatible major
/// version; callers are expected to rebuild from the live catalog instead.
#[instrument(skip(bytes, config), fields(len = bytes.len()))]
pub fn deserialize(bytes: &[u8], config: GraphConfig) -> Result<Option<Database>> {
    let snapshot = match Encoding::sniff(bytes) {
        Encoding::Binary => decode_binary(bytes)?,
        Encoding::Json => decode_json(bytes)?,
    };
    let Some(snapshot) = snapshot else {
        return Ok(None);
    };
    let db = snapshot.restore(config)?;
    debug!(database = %db.name(), tables = db.table_count(), "Snapshot restored");
    Ok(Some(db))
}

fn unsupported(found: FormatVersion) -> Option<Snapshot> {
    warn!(
        %found,
        supported = %FormatVersion::CURRENT,
        "Snapshot format version not supported"
    );
    None
}

fn decode_binary(bytes: &[u8]) -> Result<Option<Snapshot>> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Deserialization(
            "snapshot shorter than its header".to_string(),
        ));
    }
    let version = FormatVersion {
        major: u16::from_le_bytes([bytes[4], bytes[5]]),
        minor: u16::from_le_bytes([bytes[6], bytes[7]]),
    };
    if !version.is_supported() {
        return Ok(unsupported(version));
    }

    let (checksum, payload) = bytes[8..].split_at(32);
    if blake3::hash(payload).as_bytes() != checksum {
        return Err(Error::Deserialization(
            "snapshot checksum mismatch".to_string(),
        ));
    }

    let mut aligned = AlignedVec::<16>::with_capacity(payload.len());
    aligned.extend_from_slice(payload);
    let snapshot = rkyv::from_bytes::<Snapshot, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::Deserialization(e.to_string()))?;
    Ok(Some(snapshot))
}

fn decode_json(bytes: &[u8]) -> Result<Option<Snapshot>> {
    #[derive(serde::Deserialize)]
    struct Header {
        format: FormatVersion,
    }

    let header: Header =
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
    if !header.format.is_supported() {
        return Ok(unsupported(header.format));
    }
    let snapshot =
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
    Ok(Some(snapshot))
}

/// Write a snapshot to `path`, JSON for `.json` paths and binary otherwise.
#[instrument(skip(path, db), fields(path = %path.as_ref().display(), database = %db.name()))]
pub fn save(path: impl AsRef<Path>, db: &Database) -> Result<()> {
    let path = path.as_ref();
    let bytes = serialize(db, Encoding::for_path(path))?;
    std::fs::write(path, &bytes)?;
    info!(bytes = bytes.len(), "Snapshot saved");
    Ok(())
}

/// Read a snapshot written by [`save`].
#[instrument(skip(path, config), fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>, config: GraphConfig) -> Result<Option<Database>> {
    let bytes = std::fs::read(path.as_ref())?;
    let db = deserialize(&bytes, config)?;
    if let Some(db) = &db {
        info!(database = %db.name(), "Snapshot loaded");
    }
    Ok(db)
}
