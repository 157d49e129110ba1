//! Filesystem-based Content-Addressable Storage
//!
//! Provides atomic writes, collision detection, and verified
//! content-addressed reads

#![allow(clippy::result_large_err)]

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::shard_path;
use crate::errors::{cas_collision, cas_corrupt, cas_missing, io_error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem-based CAS store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a new CAS store at the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the blob for `digest` lives (whether or not it exists)
    pub fn blob_path(&self, digest: &str, extension: &str) -> PathBuf {
        shard_path(&self.root, digest, extension)
    }

    /// Write content to CAS and return the digest
    ///
    /// - Computes SHA256 digest
    /// - Writes atomically using temp→rename
    /// - Idempotent: writing same content twice succeeds
    /// - Detects collisions: writing different content with same digest fails
    pub fn write(&self, content: &[u8], extension: &str) -> Result<String> {
        let digest = compute_digest(content);
        let target_path = self.blob_path(&digest, extension);

        if target_path.exists() {
            let existing_content = fs::read(&target_path).map_err(|e| io_error("read_cas", e))?;
            if existing_content == content {
                return Ok(digest);
            }
            return Err(cas_collision(&digest));
        }

        atomic_write(&target_path, content)?;
        Ok(digest)
    }

    /// Read content from CAS by digest, verifying it still hashes to it
    pub fn read(&self, digest: &str, extension: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(digest, extension);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(cas_missing(digest)),
            Err(e) => return Err(io_error("read_cas", e)),
        };

        let actual = compute_digest(&content);
        if actual != digest {
            return Err(cas_corrupt(digest, &actual));
        }
        Ok(content)
    }

    pub fn contains(&self, digest: &str, extension: &str) -> bool {
        self.blob_path(digest, extension).exists()
    }
}

/// Compute SHA256 digest of content
fn compute_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
