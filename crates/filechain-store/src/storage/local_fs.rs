//! Local directory trees as a storage backend.
//!
//! Locations are directory paths (`/data/pdfs` or `file:///data/pdfs`).
//! Listing walks the tree recursively; paths are relative to the listed
//! directory and always `/`-separated.
//!
//! Local files carry no version history, so a FileRef's `etag` (derived
//! from size and modification time) is the only guard against reading bytes
//! that changed after listing: `open` refuses a FileRef whose etag no longer
//! matches the file on disk.

use crate::errors::{storage_unavailable, Result};
use chrono::{DateTime, Utc};
use filechain_core::errors::{ExError, ExErrorKind};
use filechain_core::glob::GlobPattern;
use filechain_core::model::FileRef;
use filechain_core::storage::{Location, StorageBackend};
use sha2::{Digest, Sha256};
use std::fs::{self, File, Metadata};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFsStorage;

impl LocalFsStorage {
    pub fn new() -> Self {
        Self
    }
}

fn directory_of(location: &str, op: &str) -> Result<(Location, PathBuf)> {
    let loc = Location::parse(location)?;
    if loc.scheme() != "file" {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op(op.to_string())
            .with_message(format!(
                "local storage cannot serve '{}' locations",
                loc.scheme()
            )));
    }
    let dir = PathBuf::from(loc.prefix());
    Ok((loc, dir))
}

/// `/`-joined path of `path` below `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn modified_at(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_default()
}

fn etag_for(metadata: &Metadata) -> String {
    let modified = modified_at(metadata);
    let fingerprint = format!(
        "{}:{}.{:09}",
        metadata.len(),
        modified.timestamp(),
        modified.timestamp_subsec_nanos()
    );
    hex::encode(Sha256::digest(fingerprint.as_bytes()))
}

impl StorageBackend for LocalFsStorage {
    fn list(&self, location: &str, pattern: Option<&GlobPattern>) -> std::result::Result<Vec<FileRef>, ExError> {
        let (loc, dir) = directory_of(location, "list")?;
        if !dir.is_dir() {
            return Err(storage_unavailable(
                "list",
                format!("{} is not a readable directory", dir.display()),
            ));
        }

        let source = loc.to_string();
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(true) {
            let entry = entry.map_err(|e| storage_unavailable("list", e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = relative_path(&dir, entry.path()) else {
                continue;
            };
            if !pattern.map_or(true, |p| p.matches(&path)) {
                continue;
            }
            let metadata = entry
                .metadata()
                .map_err(|e| storage_unavailable("list", e.to_string()))?;
            files.push(FileRef {
                source: source.clone(),
                path,
                size: metadata.len(),
                version_tag: String::new(),
                etag: etag_for(&metadata),
                is_latest: true,
                last_modified: modified_at(&metadata),
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn open(&self, file: &FileRef) -> std::result::Result<Box<dyn Read + Send>, ExError> {
        let (_, dir) = directory_of(&file.source, "open")?;
        let path = dir.join(&file.path);
        let unavailable = |message: String| {
            storage_unavailable("open", message).with_row(file.source.as_str(), file.path.as_str())
        };

        let metadata = fs::metadata(&path).map_err(|e| unavailable(e.to_string()))?;
        if etag_for(&metadata) != file.etag {
            return Err(unavailable(format!(
                "{} changed since it was listed",
                path.display()
            )));
        }
        let handle = File::open(&path).map_err(|e| unavailable(e.to_string()))?;
        Ok(Box::new(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/data");
        let path = Path::new("/data").join("a").join("b.pdf");
        assert_eq!(relative_path(root, &path), Some("a/b.pdf".to_string()));
    }

    #[test]
    fn test_list_missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = LocalFsStorage::new()
            .list(missing.to_str().unwrap(), None)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StorageUnavailable);
    }

    #[test]
    fn test_wrong_scheme_is_invalid_input() {
        let err = LocalFsStorage::new().list("mem://docs", None).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
