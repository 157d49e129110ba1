//! Immutable descriptor of one externally stored object.

use crate::model::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One object as listed from a storage backend.
///
/// Never recomputed after listing: a later listing of the same location may
/// yield new instances, but snapshots keep the ones they were built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    /// Storage root the object lives under, e.g. `mem://docs` or `file:///data`
    pub source: String,
    /// Path relative to `source`, `/`-separated
    pub path: String,
    pub size: u64,
    /// Backend-specific object version; empty when the backend is unversioned
    pub version_tag: String,
    pub etag: String,
    pub is_latest: bool,
    pub last_modified: DateTime<Utc>,
}

/// Identity of a FileRef: (source, path, version_tag)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity {
    pub source: String,
    pub path: String,
    pub version_tag: String,
}

impl FileRef {
    /// Sub-fields reachable through a `file.<field>` path.
    pub const FIELDS: [&'static str; 10] = [
        "source",
        "path",
        "name",
        "stem",
        "suffix",
        "size",
        "version",
        "etag",
        "is_latest",
        "last_modified",
    ];

    pub fn identity(&self) -> FileIdentity {
        FileIdentity {
            source: self.source.clone(),
            path: self.path.clone(),
            version_tag: self.version_tag.clone(),
        }
    }

    /// Last path segment, e.g. `2023-paper.pdf` for `neurips/2023-paper.pdf`
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without its final extension
    pub fn stem(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }

    /// Final extension without the dot; empty if there is none
    pub fn suffix(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => "",
            Some(idx) => &name[idx + 1..],
        }
    }

    /// Resolve a named sub-field as a value (see [`FileRef::FIELDS`]).
    pub fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "source" => Value::Str(self.source.clone()),
            "path" => Value::Str(self.path.clone()),
            "name" => Value::Str(self.name().to_string()),
            "stem" => Value::Str(self.stem().to_string()),
            "suffix" => Value::Str(self.suffix().to_string()),
            "size" => Value::Int(i64::try_from(self.size).unwrap_or(i64::MAX)),
            "version" => Value::Str(self.version_tag.clone()),
            "etag" => Value::Str(self.etag.clone()),
            "is_latest" => Value::Bool(self.is_latest),
            "last_modified" => Value::Timestamp(self.last_modified),
            _ => return None,
        };
        Some(value)
    }
}
