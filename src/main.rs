//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa ingest <file>` | Chunk and embed a document (no-op if already ingested) |
//! | `docqa ask <file> "<question>"` | Ingest if needed, then answer one question |
//! | `docqa chat <file>` | Answer questions read from stdin with conversational memory |
//! | `docqa serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::{commands, config, logging, server};

/// docqa: ask questions about an uploaded document.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Upload a document, ask questions about it",
    version,
    long_about = "docqa splits a document into chunks, embeds them into a collection keyed by \
    the file's content hash, and answers questions with retrieval-augmented generation, \
    rewriting follow-ups against the conversation so far."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Ingest a document (.txt, .pdf, .docx, .csv).
    ///
    /// Identical content is ingested once; later runs reuse the collection.
    Ingest {
        file: PathBuf,
    },

    /// Answer a single question about a document.
    Ask {
        file: PathBuf,
        question: String,

        /// Print the retrieved chunks after the answer.
        #[arg(long)]
        sources: bool,
    },

    /// Interactive session: one question per stdin line.
    Chat {
        file: PathBuf,

        #[arg(long)]
        sources: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Init => {
            commands::run_init(&cfg).await?;
        }
        Commands::Ingest { file } => {
            commands::run_ingest(&cfg, &file).await?;
        }
        Commands::Ask {
            file,
            question,
            sources,
        } => {
            commands::run_ask(&cfg, &file, &question, sources).await?;
        }
        Commands::Chat { file, sources } => {
            commands::run_chat(&cfg, &file, sources).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
