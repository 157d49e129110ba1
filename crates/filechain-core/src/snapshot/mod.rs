//! Immutable materialization results and registry entries.
//!
//! ## Responsibilities
//!
//! - Hold the rows and schema produced by one executor run
//! - Compute deterministic content digests over snapshot contents
//! - Define the registry entry and listing types
//!
//! ## Non-Responsibilities
//!
//! - Persistence (handled by `filechain-store`)
//! - Orchestration (handled by `filechain-engine`)

pub mod digest;
pub mod entry;
pub mod row_store;

// Re-export primary types
pub use digest::compute_content_digest;
pub use entry::{DatasetSummary, DatasetVersionEntry, DatasetVersionInfo};
pub use row_store::RowStoreSnapshot;
