//! Storage backends living outside the core crate.

pub mod local_fs;

pub use local_fs::LocalFsStorage;
