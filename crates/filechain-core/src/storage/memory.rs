//! In-memory versioned object store.
//!
//! Every `put` creates a new object version; only the newest version of a key
//! is listed, but `open` serves any version a FileRef was listed with.

use crate::errors::{ExError, ExErrorKind};
use crate::glob::GlobPattern;
use crate::model::FileRef;
use crate::storage::location::Location;
use crate::storage::StorageBackend;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::sync::Arc;

const SCHEME: &str = "mem";

#[derive(Debug, Clone)]
struct StoredVersion {
    version_tag: String,
    etag: String,
    bytes: Arc<Vec<u8>>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Bucket {
    /// key -> versions, oldest first
    objects: BTreeMap<String, Vec<StoredVersion>>,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: HashMap<String, Bucket>,
    next_version: u64,
}

/// Object store addressed as `mem://bucket/key`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.inner.write().buckets.entry(bucket.to_string()).or_default();
    }

    /// Store `bytes` as a new version of `bucket/key` (creating the bucket if
    /// needed) and return the FileRef of the new version.
    pub fn put(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) -> FileRef {
        let bytes = bytes.into();
        let mut inner = self.inner.write();
        inner.next_version += 1;
        let stored = StoredVersion {
            version_tag: format!("{:016x}", inner.next_version),
            etag: hex::encode(Sha256::digest(&bytes)),
            bytes: Arc::new(bytes),
            last_modified: Utc::now(),
        };

        let versions = inner
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .objects
            .entry(key.to_string())
            .or_default();
        versions.push(stored.clone());

        to_file_ref(&format!("{}://{}", SCHEME, bucket), key, &stored, true)
    }

    /// All versions of one key, oldest first.
    pub fn versions(&self, bucket: &str, key: &str) -> Vec<FileRef> {
        let inner = self.inner.read();
        let source = format!("{}://{}", SCHEME, bucket);
        inner
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|versions| {
                let last = versions.len().saturating_sub(1);
                versions
                    .iter()
                    .enumerate()
                    .map(|(i, v)| to_file_ref(&source, key, v, i == last))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn to_file_ref(source: &str, path: &str, stored: &StoredVersion, is_latest: bool) -> FileRef {
    FileRef {
        source: source.to_string(),
        path: path.to_string(),
        size: stored.bytes.len() as u64,
        version_tag: stored.version_tag.clone(),
        etag: stored.etag.clone(),
        is_latest,
        last_modified: stored.last_modified,
    }
}

fn unavailable(op: &str, message: String) -> ExError {
    ExError::new(ExErrorKind::StorageUnavailable)
        .with_op(op)
        .with_message(message)
}

fn parse_mem_location(location: &str, op: &str) -> Result<Location, ExError> {
    let loc = Location::parse(location)?;
    if loc.scheme() != SCHEME {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op(op)
            .with_message(format!(
                "memory storage cannot serve '{}' locations",
                loc.scheme()
            )));
    }
    Ok(loc)
}

impl StorageBackend for MemoryStorage {
    fn list(&self, location: &str, pattern: Option<&GlobPattern>) -> Result<Vec<FileRef>, ExError> {
        let loc = parse_mem_location(location, "list")?;
        let inner = self.inner.read();
        let bucket = inner
            .buckets
            .get(loc.bucket())
            .ok_or_else(|| unavailable("list", format!("bucket '{}' does not exist", loc.bucket())))?;

        let source = loc.to_string();
        let mut files = Vec::new();
        for (key, versions) in &bucket.objects {
            let Some(relative) = loc.relative(key) else {
                continue;
            };
            if pattern.map_or(true, |p| p.matches(relative)) {
                if let Some(latest) = versions.last() {
                    files.push(to_file_ref(&source, relative, latest, true));
                }
            }
        }
        Ok(files)
    }

    fn open(&self, file: &FileRef) -> Result<Box<dyn Read + Send>, ExError> {
        let loc = parse_mem_location(&file.source, "open")?;
        let key = loc.key_for(&file.path);
        let inner = self.inner.read();
        let stored = inner
            .buckets
            .get(loc.bucket())
            .and_then(|b| b.objects.get(&key))
            .and_then(|versions| versions.iter().find(|v| v.version_tag == file.version_tag))
            .ok_or_else(|| {
                unavailable(
                    "open",
                    format!("no version '{}' of {}/{}", file.version_tag, file.source, file.path),
                )
            })?;
        Ok(Box::new(Cursor::new(stored.bytes.as_ref().clone())))
    }
}
