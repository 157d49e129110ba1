//! Version registry over a SQLite ledger plus a CAS for bodies.

#![allow(clippy::result_large_err)]

use crate::cas::FsStore;
use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use crate::registry::persist::{persist_snapshot_to_cas, read_snapshot_from_cas};
use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use filechain_core::errors::{ExError, ExErrorKind};
use filechain_core::registry::{
    dataset_not_found, validate_dataset_name, version_not_found, VersionRegistry,
};
use filechain_core::model::Schema;
use filechain_core::snapshot::{
    DatasetSummary, DatasetVersionEntry, DatasetVersionInfo, RowStoreSnapshot,
};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::{Path, PathBuf};

/// One `dataset_versions` ledger row.
struct LedgerRow {
    version: u32,
    blob_digest: String,
    content_digest: String,
    row_count: i64,
    created_at_ms: i64,
    schema_json: String,
}

impl LedgerRow {
    const COLUMNS: &'static str =
        "version, blob_digest, content_digest, row_count, created_at, schema_json";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version: row.get(0)?,
            blob_digest: row.get(1)?,
            content_digest: row.get(2)?,
            row_count: row.get(3)?,
            created_at_ms: row.get(4)?,
            schema_json: row.get(5)?,
        })
    }

    fn schema(&self) -> Result<Schema> {
        serde_json::from_str(&self.schema_json).map_err(|e| {
            ExError::new(ExErrorKind::Persistence)
                .with_version(self.version)
                .with_message(format!("invalid schema_json: {}", e))
        })
    }

    fn created_at(&self) -> Result<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at_ms)
            .single()
            .ok_or_else(|| {
                ExError::new(ExErrorKind::Persistence)
                    .with_op("load")
                    .with_message(format!("invalid created_at {}", self.created_at_ms))
            })
    }

    fn info(&self, name: &str) -> Result<DatasetVersionInfo> {
        Ok(DatasetVersionInfo {
            dataset_name: name.to_string(),
            version: self.version,
            created_at: self.created_at()?,
            content_digest: self.content_digest.clone(),
            row_count: usize::try_from(self.row_count).unwrap_or_default(),
            schema: self.schema()?,
        })
    }
}

/// Registry persisting to a SQLite database and a filesystem CAS.
///
/// Versions are allocated inside an IMMEDIATE transaction, so saves from
/// other threads or processes sharing the database file serialize on the
/// SQLite write lock.
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
    cas: FsStore,
    db_path: Option<PathBuf>,
}

impl SqliteRegistry {
    /// Open (creating if needed) a registry database and CAS root.
    pub fn open(db_path: impl AsRef<Path>, cas_root: impl Into<PathBuf>) -> Result<Self> {
        let conn = db::open(db_path.as_ref())?;
        let mut registry = Self::with_connection(conn, cas_root)?;
        registry.db_path = Some(db_path.as_ref().to_path_buf());
        Ok(registry)
    }

    /// In-memory ledger with an on-disk CAS (for testing)
    pub fn open_in_memory(cas_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_connection(db::open_in_memory()?, cas_root)
    }

    fn with_connection(mut conn: Connection, cas_root: impl Into<PathBuf>) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cas: FsStore::new(cas_root),
            db_path: None,
        })
    }

    pub fn cas(&self) -> &FsStore {
        &self.cas
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn find_row(&self, name: &str, version: Option<u32>) -> Result<Option<LedgerRow>> {
        let conn = self.conn.lock();
        let row = match version {
            None => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM dataset_versions WHERE dataset_name = ?1
                         ORDER BY version DESC LIMIT 1",
                        LedgerRow::COLUMNS
                    ),
                    [name],
                    LedgerRow::from_row,
                )
                .optional(),
            Some(v) => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM dataset_versions WHERE dataset_name = ?1 AND version = ?2",
                        LedgerRow::COLUMNS
                    ),
                    rusqlite::params![name, v],
                    LedgerRow::from_row,
                )
                .optional(),
        };
        row.map_err(from_rusqlite)
    }

    fn dataset_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM dataset_versions WHERE dataset_name = ?1",
                [name],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count > 0)
    }
}

fn query_versions(conn: &Connection, name: &str) -> Result<Vec<LedgerRow>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM dataset_versions WHERE dataset_name = ?1 ORDER BY version",
            LedgerRow::COLUMNS
        ))
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([name], LedgerRow::from_row)
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

impl VersionRegistry for SqliteRegistry {
    fn save(&self, name: &str, snapshot: &RowStoreSnapshot) -> Result<DatasetVersionInfo> {
        validate_dataset_name(name)?;
        let context = |e: ExError| e.with_op("save").with_dataset(name);

        let content_digest = snapshot
            .content_digest()
            .map_err(|e| context(ExError::from(e)))?;
        let schema_json = serde_json::to_string(snapshot.schema()).map_err(|e| {
            context(ExError::new(ExErrorKind::Serialization).with_message(e.to_string()))
        })?;

        // Body first: a committed ledger row must never reference a missing blob.
        let blob_digest = persist_snapshot_to_cas(&self.cas, snapshot).map_err(context)?;

        let created_at = Utc::now().trunc_subsecs(3);
        let row_count = i64::try_from(snapshot.len()).unwrap_or(i64::MAX);

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| context(from_rusqlite(e)))?;

        let version: u32 = tx
            .query_row(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM dataset_versions WHERE dataset_name = ?1",
                [name],
                |row| row.get(0),
            )
            .map_err(|e| context(from_rusqlite(e)))?;

        tx.execute(
            "INSERT INTO dataset_versions
                (dataset_name, version, blob_digest, content_digest, row_count, schema_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                name,
                version,
                blob_digest,
                content_digest,
                row_count,
                schema_json,
                created_at.timestamp_millis()
            ],
        )
        .map_err(|e| context(from_rusqlite(e)))?;

        tx.commit().map_err(|e| context(from_rusqlite(e)))?;

        tracing::debug!(
            dataset = name,
            version,
            blob_digest = %blob_digest,
            "allocated dataset version"
        );

        Ok(DatasetVersionInfo {
            dataset_name: name.to_string(),
            version,
            created_at,
            content_digest,
            row_count: snapshot.len(),
            schema: snapshot.schema().clone(),
        })
    }

    fn load(&self, name: &str, version: Option<u32>) -> Result<DatasetVersionEntry> {
        let Some(row) = self.find_row(name, version)? else {
            if let Some(v) = version {
                if self.dataset_exists(name)? {
                    return Err(version_not_found(name, v));
                }
            }
            return Err(dataset_not_found(name));
        };

        let context = |e: ExError| {
            e.with_op("load")
                .with_dataset(name)
                .with_version(row.version)
        };

        let snapshot = read_snapshot_from_cas(&self.cas, &row.blob_digest).map_err(context)?;
        let actual = snapshot
            .content_digest()
            .map_err(|e| context(ExError::from(e)))?;
        if actual != row.content_digest {
            return Err(context(ExError::new(ExErrorKind::Integrity).with_message(
                format!(
                    "content digest mismatch: ledger has {}, body hashes to {}",
                    row.content_digest, actual
                ),
            )));
        }

        if row.schema().map_err(context)? != *snapshot.schema() {
            return Err(context(ExError::new(ExErrorKind::Integrity).with_message(
                "ledger schema does not match the stored body",
            )));
        }

        Ok(DatasetVersionEntry {
            dataset_name: name.to_string(),
            version: row.version,
            snapshot,
            created_at: row.created_at().map_err(context)?,
            content_digest: row.content_digest,
        })
    }

    fn list_versions(&self, name: &str) -> Result<Vec<DatasetVersionInfo>> {
        let rows = query_versions(&self.conn.lock(), name)?;

        if rows.is_empty() {
            return Err(dataset_not_found(name));
        }
        rows.iter().map(|r| r.info(name)).collect()
    }

    fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT dataset_name, MAX(version), COUNT(*) FROM dataset_versions
                 GROUP BY dataset_name ORDER BY dataset_name",
            )
            .map_err(from_rusqlite)?;
        let summaries = stmt
            .query_map([], |row| {
                let count: i64 = row.get(2)?;
                Ok(DatasetSummary {
                    name: row.get(0)?,
                    latest_version: row.get(1)?,
                    version_count: usize::try_from(count).unwrap_or_default(),
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(summaries)
    }
}
