use filechain_core::errors::ExError;
use filechain_core::glob::GlobPattern;
use filechain_core::model::FileRef;
use filechain_core::storage::{MemoryStorage, StorageBackend};
use filechain_core::{Executor, ExecutorConfig, Workers};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Storage wrapper counting every backend call.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingStorage {
    pub inner: MemoryStorage,
    pub lists: AtomicUsize,
    pub opens: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStorage {
    pub fn calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst) + self.opens.load(Ordering::SeqCst)
    }
}

impl StorageBackend for CountingStorage {
    fn list(&self, location: &str, pattern: Option<&GlobPattern>) -> Result<Vec<FileRef>, ExError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(location, pattern)
    }

    fn open(&self, file: &FileRef) -> Result<Box<dyn Read + Send>, ExError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(file)
    }
}

/// Bucket `docs` holding `paths`, each object containing its own path.
#[allow(dead_code)]
pub fn storage_with(paths: &[&str]) -> MemoryStorage {
    let storage = MemoryStorage::new();
    for path in paths {
        storage.put("docs", path, path.as_bytes().to_vec());
    }
    storage
}

#[allow(dead_code)]
pub fn executor_over(storage: Arc<dyn StorageBackend>, workers: usize) -> Executor {
    Executor::new(
        storage,
        ExecutorConfig::default().with_workers(Workers::Fixed(workers)),
    )
    .unwrap()
}
