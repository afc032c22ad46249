//! Ingestion stage: split extracted text and write it to a collection.
//!
//! Runs after text extraction. Re-ingesting a key that already has a
//! complete collection is a no-op that returns the existing handle. A
//! collection only becomes complete after its last batch is written, so an
//! interrupted ingestion is redone in full on the next attempt.

use tracing::{info, warn};

use crate::chunk::TextSplitter;
use crate::error::{DocQaError, Result};
use crate::index::VectorIndex;
use crate::models::CollectionHandle;

/// Maximum chunks per [`VectorIndex::upsert`] call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Chunk `text` into the collection `key`, unless it already exists.
///
/// Chunks are written in order, `batch_size` at a time; the last batch
/// holds the remainder. Whitespace-only text creates an empty collection.
pub async fn ingest_text(
    index: &dyn VectorIndex,
    splitter: &TextSplitter,
    key: &str,
    text: &str,
    batch_size: usize,
) -> Result<CollectionHandle> {
    if index.has_collection(key).await? {
        let chunk_count = index.count(key).await?;
        info!(collection = key, chunk_count, "reusing existing collection");
        return Ok(CollectionHandle {
            key: key.to_string(),
            chunk_count,
            reused: true,
        });
    }

    let chunks = splitter.chunk_text(key, text);
    if chunks.is_empty() {
        warn!(collection = key, error = %DocQaError::EmptyExtraction, "creating empty collection");
    }

    index.create_collection(key).await?;

    let batch_size = batch_size.max(1);
    for (n, batch) in chunks.chunks(batch_size).enumerate() {
        index.upsert(key, batch).await?;
        info!(collection = key, batch = n, size = batch.len(), "batch written");
    }
    index.complete_collection(key).await?;

    info!(collection = key, chunk_count = chunks.len(), "ingestion complete");
    Ok(CollectionHandle {
        key: key.to_string(),
        chunk_count: chunks.len(),
        reused: false,
    })
}
