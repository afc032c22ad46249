//! Vector index adapter: text-level upsert and retrieval by collection.
//!
//! [`VectorIndex`] is what the ingestion stage and the answer composer
//! talk to. [`EmbeddingIndex`] implements it by embedding text with an
//! [`Embedder`] and persisting vectors through a [`Store`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::{embed_query, Embedder};
use crate::error::{DocQaError, Result};
use crate::models::{Chunk, ScoredChunk};
use crate::store::Store;

/// Default number of chunks returned by [`VectorIndex::retrieve`].
pub const DEFAULT_TOP_K: usize = 4;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// True once the collection has been [completed](VectorIndex::complete_collection).
    async fn has_collection(&self, key: &str) -> Result<bool>;

    /// Create an empty, pending collection (idempotent).
    async fn create_collection(&self, key: &str) -> Result<()>;

    /// Mark a collection as fully ingested. Until then it cannot be
    /// retrieved from or reused.
    async fn complete_collection(&self, key: &str) -> Result<()>;

    /// Embed and append chunks to a collection. The only mutating data call.
    async fn upsert(&self, key: &str, chunks: &[Chunk]) -> Result<()>;

    /// Top-`k` chunks by descending similarity to `query`.
    ///
    /// Fails with [`DocQaError::CollectionNotFound`] if `key` is missing or
    /// still pending.
    async fn retrieve(&self, key: &str, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self, key: &str) -> Result<usize>;
}

/// [`VectorIndex`] over any [`Store`] + [`Embedder`] pair.
#[derive(Clone)]
pub struct EmbeddingIndex {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    /// Texts per embedding request, independent of the ingestion batch size.
    embed_batch_size: usize,
}

impl EmbeddingIndex {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            embed_batch_size: 64,
        }
    }

    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|e| DocQaError::Embedding(e.to_string()))?;
            if embedded.len() != batch.len() {
                return Err(DocQaError::Embedding(format!(
                    "expected {} vectors, provider returned {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl VectorIndex for EmbeddingIndex {
    async fn has_collection(&self, key: &str) -> Result<bool> {
        Ok(self.store.collection_exists(key).await?)
    }

    async fn create_collection(&self, key: &str) -> Result<()> {
        Ok(self.store.create_collection(key).await?)
    }

    async fn complete_collection(&self, key: &str) -> Result<()> {
        Ok(self.store.mark_complete(key).await?)
    }

    async fn upsert(&self, key: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let vectors = self.embed_chunks(chunks).await?;
        self.store.insert_chunks(key, chunks, &vectors).await?;
        Ok(())
    }

    async fn retrieve(&self, key: &str, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if !self.store.collection_exists(key).await? {
            return Err(DocQaError::CollectionNotFound(key.to_string()));
        }
        if self.store.count_chunks(key).await? == 0 {
            return Ok(Vec::new());
        }
        let query_vec = embed_query(self.embedder.as_ref(), query)
            .await
            .map_err(|e| DocQaError::Embedding(e.to_string()))?;
        Ok(self.store.vector_search(key, &query_vec, k).await?)
    }

    async fn count(&self, key: &str) -> Result<usize> {
        Ok(self.store.count_chunks(key).await?)
    }
}
