use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema. Every statement is idempotent, so this runs on
/// `init` and again before serving.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One row per ingested document, keyed by truncated content hash.
    // `complete` flips to 1 after the last chunk batch is written.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            key TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            complete INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunks carry their embedding as a little-endian f32 BLOB
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(collection, chunk_index),
            FOREIGN KEY (collection) REFERENCES collections(key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Upload log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_ext TEXT NOT NULL,
            content_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            uploaded_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash)")
        .execute(pool)
        .await?;

    Ok(())
}
