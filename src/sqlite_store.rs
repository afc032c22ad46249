//! SQLite-backed [`Store`].
//!
//! Collections and chunks live in the `collections` and `chunks` tables
//! created by [`crate::migrate`]. Vectors are stored as BLOBs and
//! similarity is computed in Rust over the collection's rows. A collection
//! row stays pending (`complete = 0`) until ingestion marks it complete.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docqa_core::models::{Chunk, ScoredChunk};
use docqa_core::store::{rank_candidates, Store};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_collection(&self, key: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO collections (key, created_at) VALUES (?, ?)")
            .bind(key)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn collection_exists(&self, key: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM collections WHERE key = ? AND complete = 1",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn mark_complete(&self, key: &str) -> Result<()> {
        let result = sqlx::query("UPDATE collections SET complete = 1 WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("cannot complete unknown collection '{}'", key);
        }
        Ok(())
    }

    async fn insert_chunks(
        &self,
        key: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.len() != vectors.len() {
            anyhow::bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let mut tx = self.pool.begin().await?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO chunks (id, collection, chunk_index, text, hash, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(key)
            .bind(chunk.index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn vector_search(
        &self,
        key: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chunk_index, text, hash, embedding
            FROM chunks
            WHERE collection = ?
            "#,
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_vec, &blob_to_vec(&blob));
                ScoredChunk {
                    chunk: Chunk {
                        id: row.get("id"),
                        collection: key.to_string(),
                        index: row.get("chunk_index"),
                        text: row.get("text"),
                        hash: row.get("hash"),
                    },
                    score,
                }
            })
            .collect();

        Ok(rank_candidates(candidates, limit))
    }

    async fn count_chunks(&self, key: &str) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
