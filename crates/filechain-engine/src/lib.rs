//! filechain Engine - Orchestration layer
//!
//! Provides the `Session` front door (collect/show/save/load with request
//! correlation and op logging), engine command dispatch and TOML
//! configuration, coordinating filechain-core with filechain-store.

pub mod commands;
pub mod config;
pub mod session;

pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use config::FilechainConfig;
pub use session::Session;
