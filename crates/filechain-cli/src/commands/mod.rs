//! Subcommands and the session setup they share.

pub mod datasets;
pub mod ingest;
pub mod ls;
pub mod show;

use clap::Args;
use filechain_core::errors::ExError;
use filechain_core::logging_facility;
use filechain_engine::config::WorkersSetting;
use filechain_engine::{FilechainConfig, Session};
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ExError>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file
    #[arg(long, global = true, default_value = "filechain.toml")]
    pub config: PathBuf,

    /// Registry database (overrides configuration)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Snapshot CAS directory (overrides configuration)
    #[arg(long, global = true)]
    pub cas: Option<PathBuf>,

    /// Worker count for map/expand stages: "auto" or an integer
    #[arg(long, global = true)]
    pub workers: Option<String>,
}

/// Load configuration, apply flag overrides, start logging and open a session.
pub fn open_session(global: &GlobalArgs) -> Result<Session> {
    let mut config = FilechainConfig::load(Some(&global.config))?;
    if let Some(db) = &global.db {
        config.store.db_path = db.clone();
    }
    if let Some(cas) = &global.cas {
        config.store.cas_path = cas.clone();
    }
    if let Some(workers) = &global.workers {
        config.executor.workers = WorkersSetting::parse(workers);
        config.validate()?;
    }

    logging_facility::init(config.log_profile()?);
    Session::open(&config)
}
