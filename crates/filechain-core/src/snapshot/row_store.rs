//! The realized output of one plan materialization.

use crate::errors::Result;
use crate::model::{Row, Schema};
use crate::snapshot::digest::compute_content_digest;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Immutable ordered rows sharing one schema.
///
/// `version` is a process-wide, strictly increasing materialization number.
/// It is unrelated to the per-dataset versions the registry allocates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowStoreSnapshot {
    version: u64,
    schema: Schema,
    rows: Vec<Row>,
}

impl RowStoreSnapshot {
    /// Build a snapshot, checking every row against `schema`.
    ///
    /// # Errors
    ///
    /// `SchemaViolation` for the first row that does not conform.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for row in &rows {
            schema.check(row, "snapshot")?;
        }
        Ok(Self {
            version: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            schema,
            rows,
        })
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            version: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// See [`compute_content_digest`].
    pub fn content_digest(&self) -> Result<String> {
        compute_content_digest(self)
    }
}
