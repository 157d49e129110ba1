//! Sharding logic for CAS
//!
//! Shards blobs into subdirectories based on the first 2 hex characters
//! of the digest to avoid filesystem performance issues with too many
//! files in a single directory.

use std::path::{Path, PathBuf};

/// Compute the shard path for a given digest
///
/// For digest "abc123...", returns "<root>/ab/abc123.<ext>"
pub fn shard_path(root: &Path, digest: &str, extension: &str) -> PathBuf {
    let shard = &digest[..2.min(digest.len())];
    root.join(shard).join(format!("{}.{}", digest, extension))
}
