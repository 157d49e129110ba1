//! Persistent lazy query plans.
//!
//! A plan is an immutable linked chain of stages ending at a storage
//! source. Chaining returns a new plan sharing the existing chain, so two
//! branches can grow from one prefix. No listing, reading or user code
//! runs until an action (`collect`, `show`, `save`) is called.
//!
//! ```
//! use filechain_core::{col, Plan};
//!
//! let pdfs = Plan::from_storage("mem://docs")
//!     .filter(col("file.path").unwrap().glob("*.pdf").unwrap());
//! let big = pdfs.filter(col("file.size").unwrap().greater_than(1_000_000i64));
//! let small = pdfs.filter(col("file.size").unwrap().less_eq(1_000_000i64));
//! assert_eq!(big.stages().len(), 3);
//! assert_eq!(small.stages().len(), 3);
//! ```

pub mod stage;
pub mod udf;

pub use stage::Stage;
pub use udf::{ExpandFn, MapFn, RowStream, UdfContext};

use crate::errors::{ChainError, ExError, Result, UdfResult};
use crate::exec::Executor;
use crate::expr::Expr;
use crate::glob::GlobPattern;
use crate::model::{FieldPath, Row, Schema, Value};
use crate::registry::VersionRegistry;
use crate::render::render_table;
use crate::snapshot::{DatasetVersionInfo, RowStoreSnapshot};
use std::sync::Arc;
use udf::FnExpand;

struct PlanNode {
    stage: Stage,
    prev: Option<Arc<PlanNode>>,
}

#[derive(Clone)]
pub struct Plan {
    head: Arc<PlanNode>,
}

impl Plan {
    /// Plan over every object under `location`.
    pub fn from_storage(location: impl Into<String>) -> Plan {
        Self::source(location.into(), None)
    }

    /// Plan over the objects under `location` whose relative path matches
    /// the glob `pattern`.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` if the glob does not compile.
    pub fn from_storage_glob(location: impl Into<String>, pattern: &str) -> Result<Plan> {
        Ok(Self::source(location.into(), Some(GlobPattern::compile(pattern)?)))
    }

    fn source(location: String, pattern: Option<GlobPattern>) -> Plan {
        Plan {
            head: Arc::new(PlanNode {
                stage: Stage::Source { location, pattern },
                prev: None,
            }),
        }
    }

    fn push(&self, stage: Stage) -> Plan {
        Plan {
            head: Arc::new(PlanNode {
                stage,
                prev: Some(Arc::clone(&self.head)),
            }),
        }
    }

    /// Keep rows for which `predicate` evaluates to true.
    pub fn filter(&self, predicate: Expr) -> Plan {
        self.push(Stage::Filter(predicate))
    }

    pub fn map<F>(&self, name: &str, output_schema: Schema, func: F) -> Plan
    where
        F: Fn(&Row, &UdfContext) -> UdfResult<Row> + Send + Sync + 'static,
    {
        self.map_with(name, output_schema, Arc::new(func))
    }

    pub fn map_with(&self, name: &str, output_schema: Schema, func: Arc<dyn MapFn>) -> Plan {
        self.push(Stage::Map {
            name: name.to_string(),
            func,
            output_schema,
        })
    }

    /// Add a one-to-many stage from a closure returning an owned iterable of
    /// rows (a `Vec`, or any `'static` iterator for lazy production).
    pub fn expand<F, I>(&self, name: &str, output_schema: Schema, func: F) -> Plan
    where
        F: Fn(&Row, &UdfContext) -> UdfResult<I> + Send + Sync + 'static,
        I: IntoIterator<Item = UdfResult<Row>> + 'static,
        I::IntoIter: 'static,
    {
        self.expand_with(name, output_schema, Arc::new(FnExpand::new(func)))
    }

    pub fn expand_with(&self, name: &str, output_schema: Schema, func: Arc<dyn ExpandFn>) -> Plan {
        self.push(Stage::Expand {
            name: name.to_string(),
            func,
            output_schema,
        })
    }

    /// Add or overwrite top-level `column` with the value of `expr`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `column` is empty or a dotted path.
    pub fn mutate(&self, column: &str, expr: Expr) -> Result<Plan> {
        if column.trim().is_empty() || column.contains('.') {
            return Err(ChainError::InvalidInput {
                reason: format!("mutate target '{}' must be a plain column name", column),
            });
        }
        Ok(self.push(Stage::Mutate {
            column: column.to_string(),
            expr,
        }))
    }

    /// Stable sort on a column or nested field path.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed path.
    pub fn order_by(&self, column: &str, descending: bool) -> Result<Plan> {
        Ok(self.push(Stage::OrderBy {
            column: FieldPath::parse(column)?,
            descending,
        }))
    }

    /// Drop rows whose `column` value was already seen. The first
    /// occurrence wins and row order is otherwise unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed path.
    pub fn distinct(&self, column: &str) -> Result<Plan> {
        Ok(self.push(Stage::Distinct(FieldPath::parse(column)?)))
    }

    pub fn limit(&self, n: usize) -> Plan {
        self.push(Stage::Limit(n))
    }

    /// Stages in execution order, source first.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        let mut node = Some(&self.head);
        while let Some(current) = node {
            stages.push(current.stage.clone());
            node = current.prev.as_ref();
        }
        stages.reverse();
        stages
    }

    // ---- actions ----

    /// Materialize the plan.
    ///
    /// # Errors
    ///
    /// Whatever the executor reports; see [`Executor::execute`].
    pub fn collect(&self, executor: &Executor) -> std::result::Result<RowStoreSnapshot, ExError> {
        executor.execute(self)
    }

    /// Materialize the plan and return the values of one column (or nested
    /// field), in row order.
    ///
    /// # Errors
    ///
    /// Executor errors; `InvalidInput` for a malformed path and
    /// `ColumnNotFound` if a row lacks the column.
    pub fn collect_column(
        &self,
        executor: &Executor,
        column: &str,
    ) -> std::result::Result<Vec<Value>, ExError> {
        let path = FieldPath::parse(column)
            .map_err(|e| ExError::from(e).with_op("collect_column"))?;
        let snapshot = executor.execute(self)?;
        snapshot
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| {
                row.get_path(&path).ok_or_else(|| {
                    let err = ExError::from(ChainError::ColumnNotFound {
                        column: path.to_string(),
                    })
                    .with_op("collect_column")
                    .with_row_index(index);
                    match row.identity() {
                        Some((source, file)) => err.with_row(source, file),
                        None => err,
                    }
                })
            })
            .collect()
    }

    /// Materialize at most `n` rows and render them as a Markdown table.
    ///
    /// # Errors
    ///
    /// As for [`Plan::collect`].
    pub fn show(&self, executor: &Executor, n: usize) -> std::result::Result<String, ExError> {
        let snapshot = executor.execute(&self.limit(n))?;
        Ok(render_table(&snapshot, n))
    }

    /// Materialize and register the result as the next version of `name`.
    /// Nothing is registered unless the whole materialization succeeds.
    ///
    /// # Errors
    ///
    /// Executor errors, then registry errors.
    pub fn save(
        &self,
        executor: &Executor,
        registry: &dyn VersionRegistry,
        name: &str,
    ) -> std::result::Result<DatasetVersionInfo, ExError> {
        let snapshot = executor.execute(self)?;
        registry.save(name, &snapshot)
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stages()).finish()
    }
}
