//! Process-local version registry.

use crate::errors::ExError;
use crate::registry::{dataset_not_found, validate_dataset_name, version_not_found, VersionRegistry};
use crate::snapshot::{DatasetSummary, DatasetVersionEntry, DatasetVersionInfo, RowStoreSnapshot};
use chrono::{SubsecRound, Utc};
use dashmap::DashMap;

/// Registry keeping every entry in memory.
///
/// Each name's history sits behind its own map shard lock; allocating the
/// next version and appending happen while that lock is held.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    datasets: DashMap<String, Vec<DatasetVersionEntry>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionRegistry for InMemoryRegistry {
    fn save(&self, name: &str, snapshot: &RowStoreSnapshot) -> Result<DatasetVersionInfo, ExError> {
        validate_dataset_name(name)?;
        let content_digest = snapshot
            .content_digest()
            .map_err(|e| ExError::from(e).with_op("save").with_dataset(name))?;

        let mut history = self.datasets.entry(name.to_string()).or_default();
        let version = history.last().map_or(1, |e| e.version + 1);
        let entry = DatasetVersionEntry {
            dataset_name: name.to_string(),
            version,
            snapshot: snapshot.clone(),
            created_at: Utc::now().trunc_subsecs(3),
            content_digest,
        };
        let info = entry.info();
        history.push(entry);
        tracing::debug!(dataset = name, version, "allocated dataset version");
        Ok(info)
    }

    fn load(&self, name: &str, version: Option<u32>) -> Result<DatasetVersionEntry, ExError> {
        let history = self
            .datasets
            .get(name)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| dataset_not_found(name))?;

        let entry = match version {
            None => history.last(),
            Some(v) => history.iter().find(|e| e.version == v),
        };
        match (entry, version) {
            (Some(entry), _) => Ok(entry.clone()),
            (None, Some(v)) => Err(version_not_found(name, v)),
            (None, None) => Err(dataset_not_found(name)),
        }
    }

    fn list_versions(&self, name: &str) -> Result<Vec<DatasetVersionInfo>, ExError> {
        let history = self
            .datasets
            .get(name)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| dataset_not_found(name))?;
        Ok(history.iter().map(DatasetVersionEntry::info).collect())
    }

    fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ExError> {
        let mut summaries: Vec<DatasetSummary> = self
            .datasets
            .iter()
            .filter_map(|item| {
                item.value().last().map(|latest| DatasetSummary {
                    name: item.key().clone(),
                    latest_version: latest.version,
                    version_count: item.value().len(),
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }
}
