//! Version registry records.

use crate::model::Schema;
use crate::snapshot::row_store::RowStoreSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One saved version of a named dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVersionEntry {
    pub dataset_name: String,
    /// Starts at 1, strictly increasing per name
    pub version: u32,
    pub snapshot: RowStoreSnapshot,
    pub created_at: DateTime<Utc>,
    pub content_digest: String,
}

impl DatasetVersionEntry {
    pub fn info(&self) -> DatasetVersionInfo {
        DatasetVersionInfo {
            dataset_name: self.dataset_name.clone(),
            version: self.version,
            created_at: self.created_at,
            content_digest: self.content_digest.clone(),
            row_count: self.snapshot.len(),
            schema: self.snapshot.schema().clone(),
        }
    }
}

/// Entry metadata without the snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetVersionInfo {
    pub dataset_name: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub content_digest: String,
    pub row_count: usize,
    /// Schema of the saved rows
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub latest_version: u32,
    pub version_count: usize,
}
