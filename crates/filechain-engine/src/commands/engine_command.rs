//! Engine-level commands: one enum the CLI (or any other front end) builds
//! and hands to `apply_engine_command`.

use crate::commands::ingest::ingest_plan;
use crate::session::{Result, Session};
use filechain_core::core_types::schema::{OP_INGEST, OP_LIST_FILES};
use filechain_core::glob::GlobPattern;
use filechain_core::{DatasetSummary, DatasetVersionEntry, DatasetVersionInfo, FileRef, Plan};

#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// List the files under a location.
    ListFiles {
        location: String,
        glob: Option<String>,
    },
    /// Chunk the text files under a location and save them as a new version.
    Ingest {
        location: String,
        glob: Option<String>,
        dataset: String,
        chunk_size: usize,
    },
    /// Materialize an arbitrary plan and save it.
    Save { plan: Plan, dataset: String },
    Load {
        dataset: String,
        version: Option<u32>,
    },
    Show {
        dataset: String,
        version: Option<u32>,
        limit: usize,
    },
    ListDatasets,
    ListVersions { dataset: String },
}

#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    Files(Vec<FileRef>),
    Saved(DatasetVersionInfo),
    Loaded(Box<DatasetVersionEntry>),
    Table(String),
    Datasets(Vec<DatasetSummary>),
    Versions(Vec<DatasetVersionInfo>),
}

pub fn apply_engine_command(cmd: EngineCommand, session: &Session) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::ListFiles { location, glob } => {
            let files = session.action(OP_LIST_FILES, || {
                let pattern = glob.as_deref().map(GlobPattern::compile).transpose()?;
                let files = session
                    .executor()
                    .storage()
                    .list(&location, pattern.as_ref())?;
                tracing::info!(location = %location, files = files.len(), "listed files");
                Ok(files)
            })?;
            Ok(EngineCommandResult::Files(files))
        }
        EngineCommand::Ingest {
            location,
            glob,
            dataset,
            chunk_size,
        } => {
            let info = session.action(OP_INGEST, || {
                let plan = ingest_plan(&location, glob.as_deref(), chunk_size)?;
                let snapshot = plan.collect(session.executor())?;
                session.registry().save(&dataset, &snapshot)
            })?;
            Ok(EngineCommandResult::Saved(info))
        }
        EngineCommand::Save { plan, dataset } => {
            Ok(EngineCommandResult::Saved(session.save(&plan, &dataset)?))
        }
        EngineCommand::Load { dataset, version } => Ok(EngineCommandResult::Loaded(Box::new(
            session.load(&dataset, version)?,
        ))),
        EngineCommand::Show {
            dataset,
            version,
            limit,
        } => Ok(EngineCommandResult::Table(
            session.show_dataset(&dataset, version, limit)?,
        )),
        EngineCommand::ListDatasets => Ok(EngineCommandResult::Datasets(session.list_datasets()?)),
        EngineCommand::ListVersions { dataset } => Ok(EngineCommandResult::Versions(
            session.list_versions(&dataset)?,
        )),
    }
}
