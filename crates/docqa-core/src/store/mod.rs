//! Storage abstraction for embedded chunks.
//!
//! The [`Store`] trait is the vector-level persistence seam: it knows
//! about collections, chunks, and their vectors, but nothing about
//! embedding models. [`crate::index::EmbeddingIndex`] layers an
//! [`Embedder`](crate::embedding::Embedder) on top to provide text-level
//! upsert and retrieval.
//!
//! Implementations must be `Send + Sync` and safe for concurrent use
//! across collections.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create_collection`](Store::create_collection) | Register a pending collection (idempotent) |
//! | [`mark_complete`](Store::mark_complete) | Flag a collection as fully written |
//! | [`collection_exists`](Store::collection_exists) | Check whether a collection is complete |
//! | [`insert_chunks`](Store::insert_chunks) | Append chunks with their vectors |
//! | [`vector_search`](Store::vector_search) | Cosine similarity search within a collection |
//! | [`count_chunks`](Store::count_chunks) | Number of chunks stored in a collection |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, ScoredChunk};

#[async_trait]
pub trait Store: Send + Sync {
    /// Create the collection if it does not exist yet. A new collection
    /// starts pending and is invisible to [`collection_exists`](Store::collection_exists).
    async fn create_collection(&self, key: &str) -> Result<()>;

    /// Flag a collection as fully written. Idempotent.
    async fn mark_complete(&self, key: &str) -> Result<()>;

    /// True only for collections that were [marked complete](Store::mark_complete).
    async fn collection_exists(&self, key: &str) -> Result<bool>;

    /// Append chunks and their vectors to a collection.
    ///
    /// `chunks` and `vectors` are parallel slices. A chunk whose id is
    /// already stored is left untouched; records are never updated in place.
    async fn insert_chunks(&self, key: &str, chunks: &[Chunk], vectors: &[Vec<f32>])
        -> Result<()>;

    /// Top-`limit` chunks of a collection by descending cosine similarity.
    ///
    /// Ties are broken by ascending chunk index.
    async fn vector_search(
        &self,
        key: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    async fn count_chunks(&self, key: &str) -> Result<usize>;
}

/// Sort candidates by descending score, then ascending chunk index, and
/// keep the first `limit`.
pub fn rank_candidates(mut candidates: Vec<ScoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.index.cmp(&b.chunk.index))
    });
    candidates.truncate(limit);
    candidates
}
