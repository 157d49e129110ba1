//! `filechain ls <dir> [--glob PATTERN]`

use crate::commands::Result;
use clap::Args;
use filechain_engine::{apply_engine_command, EngineCommand, EngineCommandResult, Session};

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Directory to list (recursively)
    pub dir: String,

    /// Only list paths matching this glob, e.g. "*.pdf"
    #[arg(long)]
    pub glob: Option<String>,
}

pub fn execute(session: &Session, args: LsArgs) -> Result<()> {
    let cmd = EngineCommand::ListFiles {
        location: args.dir,
        glob: args.glob,
    };
    if let EngineCommandResult::Files(files) = apply_engine_command(cmd, session)? {
        for file in &files {
            println!(
                "{}\t{}\t{}",
                file.path,
                file.size,
                file.last_modified.format("%Y-%m-%dT%H:%M:%SZ")
            );
        }
        eprintln!("{} file(s)", files.len());
    }
    Ok(())
}
