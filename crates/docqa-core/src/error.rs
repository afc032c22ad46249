//! Error taxonomy shared by ingestion, retrieval, and answering.

use thiserror::Error;

/// Errors surfaced by the docqa pipeline.
///
/// Store and provider traits return `anyhow::Result`; the pipeline maps
/// those failures onto the variant that names the failing stage.
#[derive(Debug, Error)]
pub enum DocQaError {
    #[error("unsupported file format: '{0}' (expected .txt, .docx, .pdf or .csv)")]
    UnsupportedFormat(String),

    #[error("document is {size} bytes, limit is {limit} bytes")]
    Oversize { size: u64, limit: u64 },

    /// Non-fatal: ingestion continues with an empty collection.
    #[error("no text could be extracted from the document")]
    EmptyExtraction,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("answer generation failed: {0}")]
    AnswerGeneration(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T, E = DocQaError> = std::result::Result<T, E>;
