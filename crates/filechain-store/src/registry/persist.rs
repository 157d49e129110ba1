//! Snapshot body persistence.
//!
//! Snapshot bodies are written to CAS as JSON before the ledger row that
//! references them is inserted, so a committed ledger row always points at
//! an existing blob. An aborted save can leave an unreferenced blob behind;
//! that is harmless.

#![allow(clippy::result_large_err)]

use crate::cas::FsStore;
use crate::errors::Result;
use filechain_core::errors::{ExError, ExErrorKind};
use filechain_core::snapshot::RowStoreSnapshot;

pub(crate) const BLOB_EXTENSION: &str = "json";

/// Persist a snapshot to content-addressable storage.
///
/// ## Returns
///
/// SHA256 digest of the serialized body (the CAS key)
///
/// ## Errors
///
/// - `ExErrorKind::Serialization`: JSON serialization failed
/// - `ExErrorKind::Io` / `ExErrorKind::Integrity`: CAS write failed
pub fn persist_snapshot_to_cas(store: &FsStore, snapshot: &RowStoreSnapshot) -> Result<String> {
    let json = serde_json::to_vec(snapshot).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("persist_snapshot_to_cas")
            .with_message(format!("Failed to serialize snapshot: {}", e))
    })?;

    let digest = store.write(&json, BLOB_EXTENSION)?;

    tracing::debug!(
        digest = %digest,
        size_bytes = json.len(),
        rows = snapshot.len(),
        "Persisted snapshot to CAS"
    );

    Ok(digest)
}

/// Read a snapshot body back from CAS.
///
/// ## Errors
///
/// - `ExErrorKind::Persistence`: blob missing
/// - `ExErrorKind::Integrity`: blob no longer hashes to its key
/// - `ExErrorKind::Serialization`: blob is not a snapshot
pub fn read_snapshot_from_cas(store: &FsStore, blob_digest: &str) -> Result<RowStoreSnapshot> {
    let bytes = store.read(blob_digest, BLOB_EXTENSION)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ExError::new(ExErrorKind::Serialization)
            .with_op("read_snapshot_from_cas")
            .with_message(format!("Failed to deserialize snapshot {}: {}", blob_digest, e))
    })
}
