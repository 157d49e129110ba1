//! filechain Store - Persistence layer with SQLite, CAS and local files
//!
//! Provides:
//! - SQLite schema with migrations framework
//! - Content-addressable storage (CAS) for snapshot bodies
//! - SQLite-backed version registry
//! - Local filesystem storage backend

pub mod cas;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod registry;
pub mod storage;

// Re-export key types
pub use errors::Result;
pub use registry::SqliteRegistry;
pub use storage::LocalFsStorage;
