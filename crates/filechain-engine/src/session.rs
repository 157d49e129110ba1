//! Session: one storage backend, one registry and one executor, with every
//! action correlated and logged.
//!
//! Each action runs under a fresh `RequestContext` carrying the session's
//! `TraceId`; its `request_id` is attached to the log events it emits and
//! to any error it returns.

use crate::config::FilechainConfig;
use filechain_core::core_types::schema::{
    OP_COLLECT, OP_LIST_DATASETS, OP_LIST_VERSIONS, OP_LOAD, OP_SAVE, OP_SHOW,
};
use filechain_core::core_types::{RequestContext, TraceId};
use filechain_core::errors::ExError;
use filechain_core::render::render_table;
use filechain_core::{
    log_op_end, log_op_error, log_op_start, CancellationToken, DatasetSummary,
    DatasetVersionEntry, DatasetVersionInfo, Executor, ExecutorConfig, Plan, RowStoreSnapshot,
    StorageBackend, VersionRegistry,
};
use filechain_store::{LocalFsStorage, SqliteRegistry};
use std::sync::Arc;
use std::time::Instant;

pub type Result<T> = std::result::Result<T, ExError>;

pub struct Session {
    registry: Arc<dyn VersionRegistry>,
    executor: Executor,
    trace_id: TraceId,
}

impl Session {
    /// # Errors
    ///
    /// `Config` if the executor configuration is invalid.
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: Arc<dyn VersionRegistry>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        Ok(Self {
            registry,
            executor: Executor::new(storage, config)?,
            trace_id: TraceId::new(),
        })
    }

    /// Local filesystem storage plus the SQLite registry named by `config`.
    pub fn open(config: &FilechainConfig) -> Result<Self> {
        let registry = SqliteRegistry::open(&config.store.db_path, config.store.cas_path.clone())?;
        tracing::debug!(
            db_path = %config.store.db_path.display(),
            cas_path = %config.store.cas_path.display(),
            "opened registry"
        );
        Self::new(
            Arc::new(LocalFsStorage::new()),
            Arc::new(registry),
            config.executor_config()?,
        )
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<dyn VersionRegistry> {
        &self.registry
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// Token that cancels in-flight and future materializations of this session.
    ///
    /// After a cancel every materializing action fails with `Cancelled`
    /// until [`Session::reset_cancellation`] is called. Registry reads are
    /// unaffected.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.executor.cancellation_token()
    }

    /// Lower the cancellation signal so the session can materialize again.
    pub fn reset_cancellation(&self) {
        self.executor.cancellation_token().reset();
        tracing::debug!(trace_id = %self.trace_id, "cancellation reset");
    }

    pub fn collect(&self, plan: &Plan) -> Result<RowStoreSnapshot> {
        self.action(OP_COLLECT, || plan.collect(&self.executor))
    }

    pub fn show(&self, plan: &Plan, n: usize) -> Result<String> {
        self.action(OP_SHOW, || plan.show(&self.executor, n))
    }

    pub fn save(&self, plan: &Plan, name: &str) -> Result<DatasetVersionInfo> {
        self.action(OP_SAVE, || {
            let info = plan.save(&self.executor, self.registry.as_ref(), name)?;
            tracing::info!(dataset = name, version = info.version, rows = info.row_count, "saved dataset");
            Ok(info)
        })
    }

    /// Persist an already materialized snapshot.
    pub fn save_snapshot(&self, name: &str, snapshot: &RowStoreSnapshot) -> Result<DatasetVersionInfo> {
        self.action(OP_SAVE, || self.registry.save(name, snapshot))
    }

    pub fn load(&self, name: &str, version: Option<u32>) -> Result<DatasetVersionEntry> {
        self.action(OP_LOAD, || self.registry.load(name, version))
    }

    /// Render the first `n` rows of a saved version.
    pub fn show_dataset(&self, name: &str, version: Option<u32>, n: usize) -> Result<String> {
        self.action(OP_SHOW, || {
            let entry = self.registry.load(name, version)?;
            Ok(render_table(&entry.snapshot, n))
        })
    }

    pub fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        self.action(OP_LIST_DATASETS, || self.registry.list_datasets())
    }

    pub fn list_versions(&self, name: &str) -> Result<Vec<DatasetVersionInfo>> {
        self.action(OP_LIST_VERSIONS, || self.registry.list_versions(name))
    }

    pub(crate) fn action<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let ctx = RequestContext::new().with_trace_id(self.trace_id.clone());
        let span = tracing::info_span!(
            "action",
            op,
            request_id = %ctx.request_id,
            trace_id = %self.trace_id
        );
        let _guard = span.enter();

        let start = Instant::now();
        log_op_start!(op, request_id = %ctx.request_id);

        match f() {
            Ok(value) => {
                log_op_end!(
                    op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %ctx.request_id
                );
                Ok(value)
            }
            Err(err) => {
                let err = err.with_request_id(ctx.request_id.clone());
                log_op_error!(
                    op,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %ctx.request_id
                );
                Err(err)
            }
        }
    }
}
