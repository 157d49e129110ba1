//! filechain Core - lazy dataset pipelines over file collections
//!
//! This crate provides the foundational data structures and operations for
//! filechain, including:
//! - FileRef, Value, Row and Schema models with structured field paths
//! - Pure row expressions and glob patterns
//! - Persistent lazy query plans (filter, map, expand, mutate, order, limit)
//! - A parallel executor that materializes plans into immutable snapshots
//! - Storage backend and version registry seams with in-memory implementations
//! - Content digests and Markdown table rendering of snapshots

pub mod errors;
pub mod exec;
pub mod expr;
pub mod glob;
pub mod logging_facility;
pub mod model;
pub mod plan;
pub mod registry;
pub mod render;
pub mod snapshot;
pub mod storage;

// Logging macros refer to field constants through this path.
pub use filechain_core_types as core_types;

// Re-export commonly used types
pub use errors::{ChainError, ExError, ExErrorKind, Result, UdfError, UdfResult};
pub use exec::{CancellationToken, Executor, ExecutorConfig, Workers};
pub use expr::{col, lit, Expr, ScalarFn};
pub use glob::GlobPattern;
pub use model::{DataType, FieldPath, FileRef, Row, Schema, Value};
pub use plan::{ExpandFn, MapFn, Plan, RowStream, Stage, UdfContext};
pub use registry::{InMemoryRegistry, VersionRegistry};
pub use snapshot::{DatasetSummary, DatasetVersionEntry, DatasetVersionInfo, RowStoreSnapshot};
pub use storage::{Location, MemoryStorage, StorageBackend};
