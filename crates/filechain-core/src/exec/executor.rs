//! Left-to-right interpretation of a plan into a snapshot.

use crate::errors::{panic_message, ChainError, ExError, ExErrorKind, UdfError};
use crate::exec::cancel::CancellationToken;
use crate::exec::collector::GroupCollector;
use crate::exec::config::{ExecutorConfig, Workers};
use crate::expr::Expr;
use crate::glob::GlobPattern;
use crate::model::{DataType, FieldPath, Row, Schema, Value};
use crate::plan::{Plan, Stage, UdfContext};
use crate::snapshot::RowStoreSnapshot;
use crate::storage::StorageBackend;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Rows flowing between stages together with their schema.
struct Batch {
    schema: Schema,
    rows: Vec<Row>,
}

/// Failure of one user function invocation.
enum InvokeError {
    /// Raised by user code; eligible for retry
    User(UdfError),
    /// Produced row did not conform; never retried
    Schema(ChainError),
    /// User code panicked; never retried
    Panicked(String),
}

/// Position of the stage being applied, for error context.
#[derive(Clone, Copy)]
struct StageRef<'a> {
    index: usize,
    label: &'a str,
}

impl StageRef<'_> {
    fn error(&self, err: ExError) -> ExError {
        err.with_op("execute").with_stage(self.index, self.label)
    }

    fn row_error(&self, err: ExError, row: &Row, row_index: usize) -> ExError {
        let err = self.error(err).with_row_index(row_index);
        match row.identity() {
            Some((source, path)) => err.with_row(source, path),
            None => err,
        }
    }
}

pub struct Executor {
    storage: Arc<dyn StorageBackend>,
    pool: rayon::ThreadPool,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

impl Executor {
    /// Build an executor with its own worker pool.
    ///
    /// # Errors
    ///
    /// `Config` for a zero worker count, `Internal` if the pool cannot start.
    pub fn new(storage: Arc<dyn StorageBackend>, config: ExecutorConfig) -> Result<Self, ExError> {
        if config.workers == Workers::Fixed(0) {
            return Err(ExError::new(ExErrorKind::Config)
                .with_op("executor_new")
                .with_message("worker count must be at least 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.resolve())
            .thread_name(|i| format!("filechain-worker-{}", i))
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("executor_new")
                    .with_message(format!("failed to start worker pool: {}", e))
            })?;
        Ok(Self {
            storage,
            pool,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Share an externally owned cancellation signal.
    ///
    /// The signal stays raised after a cancel: every later `execute` fails
    /// with `Cancelled` until the token is reset.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Materialize `plan` into a new snapshot.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable` / `InvalidInput` from listing the source
    /// - `StageExecutionFailure` when user code fails (after retries)
    /// - `SchemaViolation` when a stage emits a non-conforming row
    /// - `ColumnNotFound` / `TypeMismatch` from expressions
    /// - `Cancelled` once the cancellation signal is observed
    ///
    /// Every error names the stage, and the input row where there is one.
    pub fn execute(&self, plan: &Plan) -> Result<RowStoreSnapshot, ExError> {
        let stages = plan.stages();
        let labels: Vec<String> = stages.iter().map(Stage::label).collect();
        let ctx = UdfContext::new(Arc::clone(&self.storage), self.cancel.clone());

        let mut batch = Batch {
            schema: Schema::new(),
            rows: Vec::new(),
        };

        for (index, stage) in stages.iter().enumerate() {
            let at = StageRef {
                index,
                label: &labels[index],
            };
            self.check_cancelled(at)?;
            let rows_in = batch.rows.len();

            batch = match stage {
                Stage::Source { location, pattern } => self.list_source(at, location, pattern.as_ref())?,
                Stage::Filter(predicate) => apply_filter(at, batch, predicate)?,
                Stage::Map {
                    func,
                    output_schema,
                    ..
                } => self.run_parallel(at, batch.rows, output_schema, |row| {
                    let mapped = func.map(row, &ctx).map_err(InvokeError::User)?;
                    Ok(vec![conform(output_schema, mapped, at.label)?])
                })?,
                Stage::Expand {
                    func,
                    output_schema,
                    ..
                } => self.run_parallel(at, batch.rows, output_schema, |row| {
                    let stream = func.expand(row, &ctx).map_err(InvokeError::User)?;
                    let mut group = Vec::new();
                    for item in stream {
                        let produced = item.map_err(InvokeError::User)?;
                        group.push(conform(output_schema, produced, at.label)?);
                    }
                    Ok(group)
                })?,
                Stage::Mutate { column, expr } => apply_mutate(at, batch, column, expr)?,
                Stage::OrderBy { column, descending } => apply_order_by(at, batch, column, *descending)?,
                Stage::Distinct(column) => apply_distinct(at, batch, column)?,
                Stage::Limit(n) => {
                    let mut batch = batch;
                    batch.rows.truncate(*n);
                    batch
                }
            };

            debug!(
                stage = %at.label,
                stage_index = index,
                rows_in,
                rows_out = batch.rows.len(),
                "stage applied"
            );
        }

        RowStoreSnapshot::new(batch.schema, batch.rows)
            .map_err(|e| ExError::from(e).with_op("execute"))
    }

    fn check_cancelled(&self, at: StageRef<'_>) -> Result<(), ExError> {
        if self.cancel.is_cancelled() {
            return Err(at.error(
                ExError::new(ExErrorKind::Cancelled).with_message("materialization cancelled"),
            ));
        }
        Ok(())
    }

    fn list_source(
        &self,
        at: StageRef<'_>,
        location: &str,
        pattern: Option<&GlobPattern>,
    ) -> Result<Batch, ExError> {
        let files = self
            .storage
            .list(location, pattern)
            .map_err(|e| at.error(e))?;
        Ok(Batch {
            schema: Schema::file_source(),
            rows: files
                .into_iter()
                .map(|f| Row::new().with(Schema::FILE_COLUMN, f))
                .collect(),
        })
    }

    /// Run `invoke` once per input row on the worker pool.
    fn run_parallel<F>(
        &self,
        at: StageRef<'_>,
        rows: Vec<Row>,
        declared: &Schema,
        invoke: F,
    ) -> Result<Batch, ExError>
    where
        F: Fn(&Row) -> Result<Vec<Row>, InvokeError> + Sync,
    {
        let collector = GroupCollector::new();

        self.pool.install(|| {
            rows.par_iter()
                .enumerate()
                .try_for_each(|(row_index, row)| -> Result<(), ExError> {
                    // Stop dispatching once cancelled.
                    self.check_cancelled(at)?;
                    let group = self
                        .invoke_with_retries(at, row_index, &invoke, row)
                        .map_err(|e| at.row_error(invoke_error(e), row, row_index))?;
                    collector.push(row_index, group);
                    Ok(())
                })
        })?;
        // In-flight invocations may have completed after the signal.
        self.check_cancelled(at)?;

        let rows = collector.into_rows(self.config.preserve_order);
        if !declared.is_empty() {
            return Ok(Batch {
                schema: declared.clone(),
                rows,
            });
        }

        let schema = rows.first().map(Schema::infer).unwrap_or_default();
        let mut conformed = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            if let Err(e) = schema.check(&row, at.label) {
                return Err(at.row_error(ExError::from(e), &row, index));
            }
            conformed.push(row.reordered(&schema));
        }
        Ok(Batch {
            schema,
            rows: conformed,
        })
    }

    fn invoke_with_retries<F>(
        &self,
        at: StageRef<'_>,
        row_index: usize,
        invoke: &F,
        row: &Row,
    ) -> Result<Vec<Row>, InvokeError>
    where
        F: Fn(&Row) -> Result<Vec<Row>, InvokeError>,
    {
        let mut attempt = 0;
        loop {
            let outcome = catch_unwind(AssertUnwindSafe(|| invoke(row)))
                .unwrap_or_else(|payload| Err(InvokeError::Panicked(panic_message(payload.as_ref()))));
            match outcome {
                Err(InvokeError::User(err)) if attempt < self.config.max_retries => {
                    attempt += 1;
                    debug!(
                        stage = %at.label,
                        row_index,
                        attempt,
                        error = %err,
                        "retrying failed invocation"
                    );
                }
                result => return result,
            }
        }
    }
}

fn invoke_error(err: InvokeError) -> ExError {
    match err {
        InvokeError::User(e) => {
            ExError::new(ExErrorKind::StageExecutionFailure).with_message(e.to_string())
        }
        InvokeError::Schema(e) => ExError::from(e),
        InvokeError::Panicked(message) => ExError::new(ExErrorKind::StageExecutionFailure)
            .with_message(format!("user function panicked: {}", message)),
    }
}

/// Check a produced row against a declared schema; an empty declaration
/// defers to inference after the stage finishes.
fn conform(declared: &Schema, row: Row, label: &str) -> Result<Row, InvokeError> {
    if declared.is_empty() {
        return Ok(row);
    }
    declared.conform(row, label).map_err(InvokeError::Schema)
}

fn apply_filter(at: StageRef<'_>, batch: Batch, predicate: &Expr) -> Result<Batch, ExError> {
    let mut kept = Vec::with_capacity(batch.rows.len());
    for (index, row) in batch.rows.into_iter().enumerate() {
        match predicate.eval_predicate(&row) {
            Ok(true) => kept.push(row),
            Ok(false) => {}
            Err(e) => return Err(at.row_error(ExError::from(e), &row, index)),
        }
    }
    Ok(Batch {
        schema: batch.schema,
        rows: kept,
    })
}

fn apply_mutate(at: StageRef<'_>, batch: Batch, column: &str, expr: &Expr) -> Result<Batch, ExError> {
    // Type of the first non-null value; later values must agree.
    let mut column_type: Option<DataType> = None;
    let mut rows = Vec::with_capacity(batch.rows.len());

    for (index, mut row) in batch.rows.into_iter().enumerate() {
        let value = match expr.eval(&row) {
            Ok(v) => v,
            Err(e) => return Err(at.row_error(ExError::from(e), &row, index)),
        };
        if !value.is_null() {
            match &column_type {
                None => column_type = Some(value.data_type()),
                Some(expected) if !expected.accepts(&value) => {
                    let err = ChainError::SchemaViolation {
                        stage: at.label.to_string(),
                        detail: format!(
                            "column '{}' expected {}, found {}",
                            column,
                            expected,
                            value.data_type()
                        ),
                    };
                    return Err(at.row_error(ExError::from(err), &row, index));
                }
                Some(_) => {}
            }
        }
        row.set(column, value);
        rows.push(row);
    }

    Ok(Batch {
        schema: batch
            .schema
            .with_column(column, column_type.unwrap_or(DataType::Null)),
        rows,
    })
}

fn apply_order_by(
    at: StageRef<'_>,
    batch: Batch,
    column: &FieldPath,
    descending: bool,
) -> Result<Batch, ExError> {
    let mut keyed: Vec<(Value, Row)> = Vec::with_capacity(batch.rows.len());
    for (index, row) in batch.rows.into_iter().enumerate() {
        let Some(key) = row.get_path(column) else {
            let err = ChainError::ColumnNotFound {
                column: column.to_string(),
            };
            return Err(at.row_error(ExError::from(err), &row, index));
        };
        keyed.push((key, row));
    }

    // sort_by is stable; reversing the comparator keeps ties in emission order.
    if descending {
        keyed.sort_by(|(a, _), (b, _)| b.sort_cmp(a));
    } else {
        keyed.sort_by(|(a, _), (b, _)| a.sort_cmp(b));
    }

    Ok(Batch {
        schema: batch.schema,
        rows: keyed.into_iter().map(|(_, row)| row).collect(),
    })
}

/// Column value ordered by `Value::sort_cmp`, so floats and nested values
/// can be deduplicated without hashing.
struct DistinctKey(Value);

impl PartialEq for DistinctKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.sort_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for DistinctKey {}

impl PartialOrd for DistinctKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistinctKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.sort_cmp(&other.0)
    }
}

fn apply_distinct(at: StageRef<'_>, batch: Batch, column: &FieldPath) -> Result<Batch, ExError> {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::new();
    for (index, row) in batch.rows.into_iter().enumerate() {
        let Some(key) = row.get_path(column) else {
            let err = ChainError::ColumnNotFound {
                column: column.to_string(),
            };
            return Err(at.row_error(ExError::from(err), &row, index));
        };
        if seen.insert(DistinctKey(key)) {
            kept.push(row);
        }
    }
    Ok(Batch {
        schema: batch.schema,
        rows: kept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, lit};
    use crate::storage::MemoryStorage;

    fn executor(storage: MemoryStorage) -> Executor {
        Executor::new(
            Arc::new(storage),
            ExecutorConfig::default()
                .with_workers(Workers::Fixed(2))
                .with_preserve_order(true),
        )
        .unwrap()
    }

    fn docs() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.put("docs", "a.pdf", "aaaa");
        storage.put("docs", "b.txt", "bb");
        storage.put("docs", "c.pdf", "c");
        storage
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Executor::new(
            Arc::new(MemoryStorage::new()),
            ExecutorConfig::default().with_workers(Workers::Fixed(0)),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_source_rows_have_file_column() {
        let exec = executor(docs());
        let snap = Plan::from_storage("mem://docs").collect(&exec).unwrap();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.schema().names(), vec!["file"]);
    }

    #[test]
    fn test_mutate_then_order_desc() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs")
            .mutate("size", col("file.size").unwrap())
            .unwrap()
            .order_by("size", true)
            .unwrap();
        let snap = plan.collect(&exec).unwrap();
        let sizes: Vec<i64> = snap
            .rows()
            .iter()
            .map(|r| r.get("size").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(sizes, vec![4, 2, 1]);
        assert_eq!(snap.schema().to_string(), "file: file, size: int");
    }

    #[test]
    fn test_mutate_type_divergence_is_schema_violation() {
        let exec = executor(docs());
        let pdf = col("file.suffix").unwrap().equals("pdf");
        // Int for a.pdf, Str for b.txt
        let expr = Expr::func(
            crate::expr::ScalarFn::new("int_or_str", |args| {
                Ok(match args[0].as_bool() {
                    Some(true) => Value::Int(1),
                    _ => Value::Str("no".into()),
                })
            }),
            vec![pdf],
        );
        let plan = Plan::from_storage("mem://docs").mutate("tag", expr).unwrap();
        let err = plan.collect(&exec).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SchemaViolation);
        assert_eq!(err.row_path(), Some("b.txt"));
        assert_eq!(err.stage_index(), Some(1));
    }

    #[test]
    fn test_order_by_missing_column() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs").order_by("nope", false).unwrap();
        let err = plan.collect(&exec).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ColumnNotFound);
    }

    #[test]
    fn test_map_with_inferred_schema() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs").map("name_only", Schema::new(), |row, _ctx| {
            let name = row
                .get_path(&FieldPath::parse("file.name")?)
                .unwrap_or(Value::Null);
            Ok(Row::new().with("name", name))
        });
        let snap = plan.collect(&exec).unwrap();
        assert_eq!(snap.schema().to_string(), "name: str");
        assert_eq!(snap.rows()[1].get("name"), Some(&Value::from("b.txt")));
    }

    #[test]
    fn test_retries_rerun_the_whole_invocation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let storage = MemoryStorage::new();
        storage.put("docs", "only.txt", "x");
        let exec = Executor::new(
            Arc::new(storage),
            ExecutorConfig::default()
                .with_workers(Workers::Fixed(1))
                .with_max_retries(2),
        )
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let schema = Schema::new().with_field("i", DataType::Int);
        let plan = Plan::from_storage("mem://docs").expand("flaky", schema, move |_row, _ctx| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            let rows: Vec<crate::errors::UdfResult<Row>> = if attempt < 2 {
                vec![Ok(Row::new().with("i", 0)), Err("transient".into())]
            } else {
                vec![Ok(Row::new().with("i", 0)), Ok(Row::new().with("i", 1))]
            };
            Ok(rows)
        });

        let snap = plan.collect(&exec).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence_in_order() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs")
            .distinct("file.suffix")
            .unwrap();
        let snap = plan.collect(&exec).unwrap();
        let names: Vec<String> = snap
            .rows()
            .iter()
            .map(|r| r.identity().unwrap().1.to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.txt"]);
    }

    #[test]
    fn test_distinct_missing_column() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs").distinct("frame.frame_id").unwrap();
        let err = plan.collect(&exec).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ColumnNotFound);
        assert_eq!(err.stage_index(), Some(1));
        assert_eq!(err.row_path(), Some("a.pdf"));
    }

    #[test]
    fn test_panicking_expand_is_stage_failure() {
        let exec = executor(docs());
        let schema = Schema::new().with_field("n", DataType::Int);
        let plan = Plan::from_storage("mem://docs").expand("fragile", schema, |row, _ctx| {
            let path = row.identity().map(|(_, p)| p.to_string()).unwrap_or_default();
            if path == "b.txt" {
                panic!("cannot chunk {}", path);
            }
            Ok(vec![Ok::<Row, UdfError>(Row::new().with("n", 1))])
        });
        let err = plan.collect(&exec).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StageExecutionFailure);
        assert_eq!(err.stage_index(), Some(1));
        assert_eq!(err.row_path(), Some("b.txt"));
        assert!(err.message().contains("cannot chunk b.txt"));
    }

    #[test]
    fn test_panics_are_not_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let storage = MemoryStorage::new();
        storage.put("docs", "only.txt", "x");
        let exec = Executor::new(
            Arc::new(storage),
            ExecutorConfig::default()
                .with_workers(Workers::Fixed(1))
                .with_max_retries(3),
        )
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let plan = Plan::from_storage("mem://docs").map("explode", Schema::new(), move |_row, _ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("index out of bounds")
        });
        let err = plan.collect(&exec).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::StageExecutionFailure);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancellation_is_sticky_until_reset() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs");
        let token = exec.cancellation_token();

        token.cancel();
        assert_eq!(plan.collect(&exec).unwrap_err().kind(), ExErrorKind::Cancelled);
        assert_eq!(plan.collect(&exec).unwrap_err().kind(), ExErrorKind::Cancelled);

        token.reset();
        assert_eq!(plan.collect(&exec).unwrap().len(), 3);
    }

    #[test]
    fn test_limit_after_filter() {
        let exec = executor(docs());
        let plan = Plan::from_storage("mem://docs")
            .filter(lit(true))
            .limit(2);
        assert_eq!(plan.collect(&exec).unwrap().len(), 2);
    }
}
