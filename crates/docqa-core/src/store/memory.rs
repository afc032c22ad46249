//! In-memory [`Store`] implementation for tests.
//!
//! Uses a `HashMap` of collections behind `std::sync::RwLock`. Vector
//! search is brute-force cosine similarity over the collection.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

use super::{rank_candidates, Store};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Collection {
    chunks: Vec<StoredChunk>,
    complete: bool,
}

/// In-memory store. Data is lost when the value is dropped.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections created so far.
    pub fn collection_count(&self) -> usize {
        self.collections.read().map(|c| c.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_collection(&self, key: &str) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections.entry(key.to_string()).or_default();
        Ok(())
    }

    async fn collection_exists(&self, key: &str) -> Result<bool> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.get(key).is_some_and(|c| c.complete))
    }

    async fn mark_complete(&self, key: &str) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections.entry(key.to_string()).or_default().complete = true;
        Ok(())
    }

    async fn insert_chunks(
        &self,
        key: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        let mut collections = self.collections.write().map_err(poisoned)?;
        let stored = &mut collections.entry(key.to_string()).or_default().chunks;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if stored.iter().any(|s| s.chunk.id == chunk.id) {
                continue;
            }
            stored.push(StoredChunk {
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn vector_search(
        &self,
        key: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let Some(collection) = collections.get(key) else {
            return Ok(Vec::new());
        };
        let candidates = collection
            .chunks
            .iter()
            .map(|s| ScoredChunk {
                chunk: s.chunk.clone(),
                score: cosine_similarity(query_vec, &s.vector),
            })
            .collect();
        Ok(rank_candidates(candidates, limit))
    }

    async fn count_chunks(&self, key: &str) -> Result<usize> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.get(key).map(|c| c.chunks.len()).unwrap_or(0))
    }
}
