//! Plan execution.
//!
//! ## Responsibilities
//!
//! - Resolve the source listing into `file` rows
//! - Apply stages left to right, running Map and Expand on a worker pool
//! - Abort with stage and row context on the first failure
//! - Honour a cooperative cancellation signal

pub mod cancel;
pub mod collector;
pub mod config;
pub mod executor;

pub use cancel::CancellationToken;
pub use config::{ExecutorConfig, Workers};
pub use executor::Executor;
