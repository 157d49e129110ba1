//! `filechain ingest <dir> --name <dataset> [--glob PATTERN] [--chunk-size N]`

use crate::commands::Result;
use clap::Args;
use filechain_engine::commands::ingest::DEFAULT_CHUNK_SIZE;
use filechain_engine::{apply_engine_command, EngineCommand, EngineCommandResult, Session};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Directory of text files
    pub dir: String,

    /// Dataset to save the chunks under
    #[arg(long)]
    pub name: String,

    /// Only ingest paths matching this glob
    #[arg(long)]
    pub glob: Option<String>,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

pub fn execute(session: &Session, args: IngestArgs) -> Result<()> {
    let cmd = EngineCommand::Ingest {
        location: args.dir,
        glob: args.glob,
        dataset: args.name,
        chunk_size: args.chunk_size,
    };
    if let EngineCommandResult::Saved(info) = apply_engine_command(cmd, session)? {
        println!(
            "Saved {} version {} ({} rows, digest {})",
            info.dataset_name,
            info.version,
            info.row_count,
            &info.content_digest[..12.min(info.content_digest.len())]
        );
    }
    Ok(())
}
