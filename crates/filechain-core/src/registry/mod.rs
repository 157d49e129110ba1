//! Version registry seam: named, append-only snapshot histories.

pub mod memory;

pub use memory::InMemoryRegistry;

use crate::errors::{ExError, ExErrorKind};
use crate::snapshot::{DatasetSummary, DatasetVersionEntry, DatasetVersionInfo, RowStoreSnapshot};

pub trait VersionRegistry: Send + Sync {
    /// Append `snapshot` as the next version of `name` (1 for a new name).
    ///
    /// Version allocation is atomic: concurrent saves under one name never
    /// receive the same number.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty name; backend-specific persistence errors.
    fn save(&self, name: &str, snapshot: &RowStoreSnapshot) -> Result<DatasetVersionInfo, ExError>;

    /// Load version `version` of `name`, or the latest when `None`.
    ///
    /// # Errors
    ///
    /// `DatasetNotFound` if the name has no entries, `VersionNotFound` if the
    /// requested version does not exist.
    fn load(&self, name: &str, version: Option<u32>) -> Result<DatasetVersionEntry, ExError>;

    /// Version metadata of `name`, oldest first.
    ///
    /// # Errors
    ///
    /// `DatasetNotFound` if the name has no entries.
    fn list_versions(&self, name: &str) -> Result<Vec<DatasetVersionInfo>, ExError>;

    /// All dataset names with their latest version, sorted by name.
    ///
    /// # Errors
    ///
    /// Backend-specific persistence errors.
    fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ExError>;
}

/// Reject names a registry cannot store.
///
/// # Errors
///
/// `InvalidInput` for an empty or whitespace-only name.
pub fn validate_dataset_name(name: &str) -> Result<(), ExError> {
    if name.trim().is_empty() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("save")
            .with_message("dataset name must not be empty"));
    }
    Ok(())
}

pub fn dataset_not_found(name: &str) -> ExError {
    ExError::new(ExErrorKind::DatasetNotFound)
        .with_dataset(name)
        .with_message(format!("dataset '{}' has no versions", name))
}

pub fn version_not_found(name: &str, version: u32) -> ExError {
    ExError::new(ExErrorKind::VersionNotFound)
        .with_dataset(name)
        .with_version(version)
        .with_message(format!("dataset '{}' has no version {}", name, version))
}
