//! Command orchestration layer.
//!
//! Provides high-level command functions that coordinate a session's
//! executor with its registry.

pub mod engine_command;
pub mod ingest;
