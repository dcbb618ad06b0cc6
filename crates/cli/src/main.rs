//! Lectern CLI, the main entry point.
//!
//! Commands:
//! - `init`     Write a default config file
//! - `ingest`   Load a folder of course documents into the index
//! - `ask`      Ask one question, or chat interactively
//! - `courses`  List indexed courses
//! - `serve`    Start the HTTP API

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Lectern: ask questions about your course materials",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file to ~/.lectern/config.toml
    Init,

    /// Ingest every course document in a folder
    Ingest {
        /// Folder holding .txt/.md course documents
        folder: PathBuf,

        /// Drop the existing index before ingesting
        #[arg(long)]
        clear: bool,
    },

    /// Ask about the course materials
    Ask {
        /// Ask a single question instead of entering interactive mode
        question: Option<String>,

        /// Session id to continue
        #[arg(short, long)]
        session: Option<String>,
    },

    /// List the indexed courses
    Courses,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Ingest { folder, clear } => commands::ingest::run(folder, clear).await?,
        Commands::Ask { question, session } => commands::ask::run(question, session).await?,
        Commands::Courses => commands::courses::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
