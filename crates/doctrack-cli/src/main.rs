//! DocTrack CLI
//!
//! Command-line interface for inspecting a SQLite document store

use clap::{Parser, Subcommand, ValueEnum};
use doctrack_core::logging_facility::{self, Profile};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "doctrack")]
#[command(about = "DocTrack - document store change tracking", long_about = None)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = ".doctrack/store.db")]
    db: PathBuf,

    /// Log output format (RUST_LOG overrides the level)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or upgrade the document schema
    Migrate,
    /// Print one document as JSON
    Get(commands::get::GetArgs),
    /// List the documents of a collection
    List(commands::list::ListArgs),
}

fn main() {
    let cli = Cli::parse();

    logging_facility::init(match cli.log_format {
        LogFormat::Human => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    let result = match cli.command {
        Commands::Migrate => commands::migrate::execute(&cli.db),
        Commands::Get(args) => commands::get::execute(&cli.db, args),
        Commands::List(args) => commands::list::execute(&cli.db, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
