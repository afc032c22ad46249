//! Core data models used throughout docqa.
//!
//! These types represent the uploaded documents, chunks, conversation
//! turns, and answers that flow through the ingestion and answering
//! pipeline.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::DocQaError;

/// Maximum collection identifier length accepted by the vector store.
pub const MAX_COLLECTION_KEY_LEN: usize = 63;

/// Supported upload formats.
///
/// Each variant maps to one extraction strategy in the app crate, so adding
/// a format forces every `match` on the kind to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
    /// Delimited text, ingested line by line like plain text.
    Csv,
}

impl DocumentKind {
    /// Parse a declared extension (`".pdf"`, `"PDF"`, `"txt"`, ...).
    pub fn from_extension(ext: &str) -> Result<Self, DocQaError> {
        let normalized = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "csv" => Ok(Self::Csv),
            _ => Err(DocQaError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Parse the extension of a file name.
    pub fn from_file_name(name: &str) -> Result<Self, DocQaError> {
        match name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Err(DocQaError::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => ".txt",
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
            Self::Csv => ".csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Csv => "text/csv",
        }
    }
}

/// An uploaded document. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    /// Lowercase SHA-256 hex of `bytes`.
    pub content_hash: String,
}

impl Document {
    /// Build a document from raw upload bytes, validating the extension.
    pub fn from_upload(file_name: &str, bytes: Vec<u8>) -> Result<Self, DocQaError> {
        let kind = DocumentKind::from_file_name(file_name)?;
        let content_hash = content_hash(&bytes);
        Ok(Self {
            file_name: file_name.to_string(),
            kind,
            bytes,
            content_hash,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn collection_key(&self) -> String {
        collection_key(&self.content_hash)
    }
}

/// SHA-256 hex digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Collection key for a content hash, truncated to the store's identifier limit.
pub fn collection_key(content_hash: &str) -> String {
    content_hash.chars().take(MAX_COLLECTION_KEY_LEN).collect()
}

/// A chunk of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Deterministic id derived from the collection key and index.
    pub id: String,
    pub collection: String,
    pub index: i64,
    pub text: String,
    /// SHA-256 of `text`.
    pub hash: String,
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// Returned from ingestion; identifies the collection a session should query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionHandle {
    pub key: String,
    pub chunk_count: usize,
    /// True when the collection already existed and nothing was re-embedded.
    pub reused: bool,
}

/// One question/answer pair in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// The result of answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    /// The rewritten question used for retrieval.
    pub standalone_question: String,
    /// Evidence, in retrieval order.
    pub chunks: Vec<ScoredChunk>,
}
