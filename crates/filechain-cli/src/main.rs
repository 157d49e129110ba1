//! filechain CLI
//!
//! Command-line interface for filechain

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "filechain")]
#[command(about = "filechain - versioned datasets built from file collections", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the files under a directory
    Ls(commands::ls::LsArgs),
    /// Chunk the text files under a directory into a new dataset version
    Ingest(commands::ingest::IngestArgs),
    /// List saved datasets
    Datasets,
    /// List the versions of a dataset
    Versions(commands::datasets::VersionsArgs),
    /// Print the first rows of a dataset version as a table
    Show(commands::show::ShowArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = commands::open_session(&cli.global).and_then(|session| match cli.command {
        Commands::Ls(args) => commands::ls::execute(&session, args),
        Commands::Ingest(args) => commands::ingest::execute(&session, args),
        Commands::Datasets => commands::datasets::execute_datasets(&session),
        Commands::Versions(args) => commands::datasets::execute_versions(&session, args),
        Commands::Show(args) => commands::show::execute(&session, args),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
