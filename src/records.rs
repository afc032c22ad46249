//! Upload log: one `files` row per answered upload.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub file_name: String,
    pub file_path: String,
    /// Extension with its leading dot, e.g. `.pdf`.
    pub file_ext: String,
    pub content_type: String,
    pub file_size: u64,
    pub content_hash: String,
    pub question: String,
    pub answer: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Whether any upload with this content hash has been recorded.
pub async fn hash_exists(pool: &SqlitePool, content_hash: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM files WHERE content_hash = ?")
        .bind(content_hash)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn insert(pool: &SqlitePool, record: &FileRecord) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO files (id, file_name, file_path, file_ext, content_type, file_size,
                           content_hash, question, answer, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&record.file_name)
    .bind(&record.file_path)
    .bind(&record.file_ext)
    .bind(&record.content_type)
    .bind(record.file_size as i64)
    .bind(&record.content_hash)
    .bind(&record.question)
    .bind(&record.answer)
    .bind(record.uploaded_at.timestamp())
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_db_path(dir.path().join("docqa.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        assert!(!hash_exists(&pool, "abc").await.unwrap());
        let record = FileRecord {
            file_name: "notes.txt".to_string(),
            file_path: "uploads/notes.txt".to_string(),
            file_ext: ".txt".to_string(),
            content_type: "text/plain".to_string(),
            file_size: 12,
            content_hash: "abc".to_string(),
            question: "What is this?".to_string(),
            answer: "Notes.".to_string(),
            uploaded_at: Utc::now(),
        };
        insert(&pool, &record).await.unwrap();
        insert(&pool, &record).await.unwrap();

        assert!(hash_exists(&pool, "abc").await.unwrap());
        assert_eq!(count(&pool).await.unwrap(), 2);
    }
}
