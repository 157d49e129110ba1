//! User-defined row functions and the context they run with.

use crate::errors::{UdfError, UdfResult};
use crate::exec::CancellationToken;
use crate::model::{FileRef, Row};
use crate::storage::StorageBackend;
use std::io::Read;
use std::marker::PhantomData;
use std::sync::Arc;

/// Output of one Expand invocation: finite, consumed exactly once.
pub type RowStream<'a> = Box<dyn Iterator<Item = UdfResult<Row>> + 'a>;

/// One-to-many row function.
///
/// Invocations for different input rows may run concurrently on the
/// executor's worker pool. A panic, in the call or while the stream is
/// drained, is caught and reported as `StageExecutionFailure` for the input
/// row; panics are not retried.
pub trait ExpandFn: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the materialization with `StageExecutionFailure`,
    /// whether returned here or yielded by the stream.
    fn expand<'a>(&'a self, row: &'a Row, ctx: &'a UdfContext) -> UdfResult<RowStream<'a>>;
}

/// One-to-one row function. Panics are handled as for [`ExpandFn`].
pub trait MapFn: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the materialization with `StageExecutionFailure`.
    fn map(&self, row: &Row, ctx: &UdfContext) -> UdfResult<Row>;
}

impl<F> MapFn for F
where
    F: Fn(&Row, &UdfContext) -> UdfResult<Row> + Send + Sync,
{
    fn map(&self, row: &Row, ctx: &UdfContext) -> UdfResult<Row> {
        self(row, ctx)
    }
}

/// Adapts a closure returning any owned iterable into an [`ExpandFn`].
pub(crate) struct FnExpand<F, I> {
    func: F,
    _output: PhantomData<fn() -> I>,
}

impl<F, I> FnExpand<F, I> {
    pub(crate) fn new(func: F) -> Self {
        Self {
            func,
            _output: PhantomData,
        }
    }
}

impl<F, I> ExpandFn for FnExpand<F, I>
where
    F: Fn(&Row, &UdfContext) -> UdfResult<I> + Send + Sync,
    I: IntoIterator<Item = UdfResult<Row>>,
    I::IntoIter: 'static,
{
    fn expand<'a>(&'a self, row: &'a Row, ctx: &'a UdfContext) -> UdfResult<RowStream<'a>> {
        let items = (self.func)(row, ctx)?;
        Ok(Box::new(items.into_iter()))
    }
}

/// What a user function may touch besides its input row: the storage
/// backend the plan was sourced from and the cancellation signal.
#[derive(Clone)]
pub struct UdfContext {
    storage: Arc<dyn StorageBackend>,
    cancel: CancellationToken,
}

impl UdfContext {
    pub fn new(storage: Arc<dyn StorageBackend>, cancel: CancellationToken) -> Self {
        Self { storage, cancel }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// # Errors
    ///
    /// `StorageUnavailable` from the backend.
    pub fn open(&self, file: &FileRef) -> UdfResult<Box<dyn Read + Send>> {
        self.storage.open(file).map_err(UdfError::from)
    }

    /// # Errors
    ///
    /// `StorageUnavailable` from the backend.
    pub fn read_all(&self, file: &FileRef) -> UdfResult<Vec<u8>> {
        self.storage.read_all(file).map_err(UdfError::from)
    }

    /// # Errors
    ///
    /// Backend errors, or invalid UTF-8.
    pub fn read_to_string(&self, file: &FileRef) -> UdfResult<String> {
        Ok(String::from_utf8(self.read_all(file)?)?)
    }

    /// Long-running functions may poll this and stop early.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
