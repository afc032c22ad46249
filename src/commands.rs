//! CLI command implementations.
//!
//! User-facing output goes to stdout with `println!`; diagnostics go
//! through `tracing`.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::service::{AskOutcome, DocumentService};
use crate::{db, migrate, records};

pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("Database initialized successfully.");
    Ok(())
}

fn read_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((file_name, bytes))
}

pub async fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    let service = DocumentService::from_config(config).await?;
    let (file_name, bytes) = read_upload(path)?;
    let (_, _, handle) = service.ingest_file(&file_name, bytes).await?;

    if handle.reused {
        println!(
            "{}: already ingested as collection {} ({} chunks)",
            file_name, handle.key, handle.chunk_count
        );
    } else {
        println!(
            "{}: ingested {} chunks into collection {}",
            file_name, handle.chunk_count, handle.key
        );
    }
    Ok(())
}

pub async fn run_ask(config: &Config, path: &Path, question: &str, sources: bool) -> Result<()> {
    let service = DocumentService::from_config(config).await?;
    let (file_name, bytes) = read_upload(path)?;
    let mut session = service.new_session(uuid::Uuid::new_v4().to_string());

    let outcome = service.ask(&mut session, &file_name, bytes, question).await?;
    print_outcome(&outcome, sources);
    tracing::debug!(files = records::count(service.pool()).await?, "upload recorded");
    Ok(())
}

/// Read questions from stdin, one per line, in a single session.
pub async fn run_chat(config: &Config, path: &Path, sources: bool) -> Result<()> {
    let service = DocumentService::from_config(config).await?;
    let (file_name, bytes) = read_upload(path)?;
    let (_, _, handle) = service.ingest_file(&file_name, bytes).await?;

    let mut session = service.new_session(uuid::Uuid::new_v4().to_string());
    session.activate(&handle.key);
    println!(
        "Loaded {} ({} chunks). Ask a question per line; Ctrl-D to quit.",
        file_name, handle.chunk_count
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        match service.ask_active(&mut session, question).await {
            Ok(outcome) => print_outcome(&outcome, sources),
            Err(e) => {
                tracing::error!(error = %e, "question failed");
                println!("Error: {}", e);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &AskOutcome, sources: bool) {
    println!("{}", outcome.answer);
    if sources {
        println!();
        println!("Sources ({}):", outcome.chunks.len());
        for hit in &outcome.chunks {
            let preview: String = hit.chunk.text.chars().take(80).collect();
            println!(
                "  #{:<4} {:.3}  {}",
                hit.chunk.index,
                hit.score,
                preview.replace('\n', " ")
            );
        }
    }
}
