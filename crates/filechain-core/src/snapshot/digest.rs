//! Content digests for snapshots.
//!
//! The digest covers the schema and the ordered rows, serialized as
//! canonical JSON. The materialization generation is excluded, so two runs
//! that produce the same rows share a digest.

use crate::errors::{ChainError, Result};
use crate::model::{Row, Schema};
use crate::snapshot::row_store::RowStoreSnapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
struct DigestBody<'a> {
    schema: &'a Schema,
    rows: &'a [Row],
}

/// Compute the content digest of a snapshot.
///
/// ## Returns
///
/// Hex-encoded SHA256 digest (64 characters)
///
/// ## Errors
///
/// - `ChainError::InvalidInput` if a cell holds NaN or an infinity, which
///   JSON cannot represent
/// - `ChainError::Serialization` if JSON serialization fails
///
/// ## Example
///
/// ```
/// use filechain_core::model::{Row, Schema};
/// use filechain_core::snapshot::{compute_content_digest, RowStoreSnapshot};
///
/// let row = Row::new().with("key", "paper");
/// let snap = RowStoreSnapshot::new(Schema::infer(&row), vec![row]).unwrap();
/// assert_eq!(compute_content_digest(&snap).unwrap().len(), 64);
/// ```
pub fn compute_content_digest(snapshot: &RowStoreSnapshot) -> Result<String> {
    ensure_finite(snapshot)?;
    let body = DigestBody {
        schema: snapshot.schema(),
        rows: snapshot.rows(),
    };
    let canonical = serde_json::to_string(&body)?;
    Ok(hash_string(&canonical))
}

fn ensure_finite(snapshot: &RowStoreSnapshot) -> Result<()> {
    for (index, row) in snapshot.rows().iter().enumerate() {
        if let Some((column, _)) = row.columns().find(|(_, v)| !v.is_finite()) {
            return Err(ChainError::InvalidInput {
                reason: format!(
                    "column '{}' of row {} holds a non-finite float",
                    column, index
                ),
            });
        }
    }
    Ok(())
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(keys: &[&str]) -> RowStoreSnapshot {
        let rows: Vec<Row> = keys.iter().map(|k| Row::new().with("key", *k)).collect();
        let schema = Schema::new().with_field("key", crate::model::DataType::Str);
        RowStoreSnapshot::new(schema, rows).unwrap()
    }

    #[test]
    fn test_digest_ignores_generation() {
        let a = snap(&["x", "y"]);
        let b = snap(&["x", "y"]);
        assert_ne!(a.version(), b.version());
        assert_eq!(
            compute_content_digest(&a).unwrap(),
            compute_content_digest(&b).unwrap()
        );
    }

    #[test]
    fn test_digest_is_order_sensitive() {
        assert_ne!(
            compute_content_digest(&snap(&["x", "y"])).unwrap(),
            compute_content_digest(&snap(&["y", "x"])).unwrap()
        );
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let schema = Schema::new()
            .with_field("score", crate::model::DataType::Float)
            .with_field("embeddings", crate::model::DataType::Vector);
        let rows = vec![
            Row::new().with("score", 0.5).with("embeddings", vec![0.1f32]),
            Row::new().with("score", 0.5).with("embeddings", vec![f32::NAN]),
        ];
        let snap = RowStoreSnapshot::new(schema, rows).unwrap();
        match compute_content_digest(&snap).unwrap_err() {
            ChainError::InvalidInput { reason } => {
                assert!(reason.contains("'embeddings'"));
                assert!(reason.contains("row 1"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
