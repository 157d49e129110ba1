//! `filechain show <name> [--version K] [--limit N]`

use crate::commands::Result;
use clap::Args;
use filechain_engine::{apply_engine_command, EngineCommand, EngineCommandResult, Session};

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Dataset name
    pub name: String,

    /// Version to show (latest when omitted)
    #[arg(long)]
    pub version: Option<u32>,

    /// Maximum rows to print
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

pub fn execute(session: &Session, args: ShowArgs) -> Result<()> {
    let cmd = EngineCommand::Show {
        dataset: args.name,
        version: args.version,
        limit: args.limit,
    };
    if let EngineCommandResult::Table(table) = apply_engine_command(cmd, session)? {
        print!("{}", table);
    }
    Ok(())
}
