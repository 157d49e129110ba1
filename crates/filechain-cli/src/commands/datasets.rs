//! `filechain datasets` and `filechain versions <name>`

use crate::commands::Result;
use clap::Args;
use filechain_engine::{apply_engine_command, EngineCommand, EngineCommandResult, Session};

#[derive(Debug, Args)]
pub struct VersionsArgs {
    /// Dataset name
    pub name: String,
}

pub fn execute_datasets(session: &Session) -> Result<()> {
    if let EngineCommandResult::Datasets(datasets) =
        apply_engine_command(EngineCommand::ListDatasets, session)?
    {
        if datasets.is_empty() {
            println!("No datasets");
        }
        for d in datasets {
            println!("{}\tlatest={}\tversions={}", d.name, d.latest_version, d.version_count);
        }
    }
    Ok(())
}

pub fn execute_versions(session: &Session, args: VersionsArgs) -> Result<()> {
    let cmd = EngineCommand::ListVersions { dataset: args.name };
    if let EngineCommandResult::Versions(versions) = apply_engine_command(cmd, session)? {
        for v in versions {
            println!(
                "{}\t{}\t{} rows\t{}\t{}",
                v.version,
                v.created_at.to_rfc3339(),
                v.row_count,
                v.content_digest,
                v.schema
            );
        }
    }
    Ok(())
}
