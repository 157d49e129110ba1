//! SQLite-backed version registry.
//!
//! ## Responsibilities
//!
//! - Persist snapshot bodies to CAS with deterministic digests
//! - Allocate per-name versions and append ledger rows atomically
//! - Verify content digests when loading
//!
//! ## Non-Responsibilities
//!
//! - Materializing plans (handled by `filechain-core`)
//! - Orchestration (handled by `filechain-engine`)

pub mod persist;
pub mod sqlite_registry;

pub use persist::{persist_snapshot_to_cas, read_snapshot_from_cas};
pub use sqlite_registry::SqliteRegistry;
