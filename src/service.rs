//! File-level ingestion and answering.
//!
//! [`DocumentService`] owns the long-lived pieces (database pool, vector
//! index, answer composer) and runs the request flow shared by the CLI and
//! the HTTP server:
//!
//! ```text
//! upload ─▶ validate kind ─▶ validate size ─▶ hash ─▶ save upload
//!        ─▶ reuse or ingest collection ─▶ activate in session
//!        ─▶ answer ─▶ record upload
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;
use tracing::{info, warn};

use docqa_core::chunk::TextSplitter;
use docqa_core::embedding::Embedder;
use docqa_core::index::{EmbeddingIndex, VectorIndex};
use docqa_core::ingest::ingest_text;
use docqa_core::llm::LanguageModel;
use docqa_core::models::{CollectionHandle, Document, DocumentKind, ScoredChunk};
use docqa_core::pipeline::AnswerComposer;
use docqa_core::session::Session;
use docqa_core::DocQaError;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::extract_text;
use crate::llm::create_language_model;
use crate::records::{self, FileRecord};
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Result of one answered question.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub answer: String,
    pub standalone_question: String,
    pub collection_key: String,
    /// `true` when the document had already been ingested.
    pub reused: bool,
    pub chunks: Vec<ScoredChunk>,
}

pub struct DocumentService {
    pool: SqlitePool,
    index: Arc<dyn VectorIndex>,
    composer: AnswerComposer,
    splitter: TextSplitter,
    batch_size: usize,
    max_file_bytes: u64,
    upload_dir: PathBuf,
    max_turns: usize,
}

impl DocumentService {
    /// Connect to the database, run migrations and build the configured
    /// embedding and language-model providers.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        let embedder = create_embedder(&config.embedding)?;
        let llm = create_language_model(&config.llm)?;
        Ok(Self::with_components(pool, config, embedder, llm))
    }

    /// Build from an open, migrated pool and explicit providers.
    pub fn with_components(
        pool: SqlitePool,
        config: &Config,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let index: Arc<dyn VectorIndex> = Arc::new(
            EmbeddingIndex::new(store, embedder)
                .with_embed_batch_size(config.embedding.batch_size),
        );
        let composer = AnswerComposer::new(index.clone(), llm).with_top_k(config.retrieval.top_k);

        Self {
            pool,
            index,
            composer,
            splitter: config.chunking.splitter(),
            batch_size: config.ingest.batch_size,
            max_file_bytes: config.ingest.max_file_bytes,
            upload_dir: config.ingest.upload_dir.clone(),
            max_turns: config.memory.max_turns,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn new_session(&self, id: impl Into<String>) -> Session {
        Session::new(id, self.max_turns)
    }

    /// Check the extension and size of an upload and hash its content.
    pub fn validate(&self, file_name: &str, bytes: Vec<u8>) -> Result<Document, DocQaError> {
        let size = bytes.len() as u64;
        if size > self.max_file_bytes {
            // Extension first, so a bad format is reported as such.
            DocumentKind::from_file_name(file_name)?;
            return Err(DocQaError::Oversize {
                size,
                limit: self.max_file_bytes,
            });
        }
        Document::from_upload(file_name, bytes)
    }

    /// Ingestion half of the flow: validate, save, then reuse or build the
    /// document's collection.
    pub async fn ingest_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(Document, PathBuf, CollectionHandle), DocQaError> {
        let document = self.validate(file_name, bytes)?;
        let saved = self.save_upload(&document).await?;
        let key = document.collection_key();

        let seen = records::hash_exists(&self.pool, &document.content_hash).await?;
        if self.index.has_collection(&key).await? {
            let chunk_count = self.index.count(&key).await?;
            info!(file = %document.file_name, collection = %key, seen, "document already ingested");
            return Ok((
                document,
                saved,
                CollectionHandle {
                    key,
                    chunk_count,
                    reused: true,
                },
            ));
        }
        if seen {
            warn!(collection = %key, "upload recorded before but its collection is missing; re-ingesting");
        }

        let kind = document.kind;
        let bytes = document.bytes.clone();
        let text = tokio::task::spawn_blocking(move || extract_text(kind, &bytes))
            .await
            .map_err(|e| DocQaError::Extraction(format!("extraction task failed: {}", e)))??;

        let handle = ingest_text(
            self.index.as_ref(),
            &self.splitter,
            &key,
            &text,
            self.batch_size,
        )
        .await?;
        info!(
            file = %document.file_name,
            kind = ?document.kind,
            bytes = document.size(),
            chunks = handle.chunk_count,
            "document ingested"
        );
        Ok((document, saved, handle))
    }

    /// Full flow: ingest (or reuse) the upload, point `session` at it and
    /// answer `question`. The upload is recorded only after a successful
    /// answer, and the turn enters memory only after the record is written.
    pub async fn ask(
        &self,
        session: &mut Session,
        file_name: &str,
        bytes: Vec<u8>,
        question: &str,
    ) -> Result<AskOutcome, DocQaError> {
        let (document, saved, handle) = self.ingest_file(file_name, bytes).await?;
        session.activate(&handle.key);

        let result = self.composer.draft(session, question).await?;

        records::insert(
            &self.pool,
            &FileRecord {
                file_name: document.file_name.clone(),
                file_path: saved.display().to_string(),
                file_ext: document.kind.extension().to_string(),
                content_type: document.kind.content_type().to_string(),
                file_size: document.size(),
                content_hash: document.content_hash.clone(),
                question: question.to_string(),
                answer: result.answer.clone(),
                uploaded_at: chrono::Utc::now(),
            },
        )
        .await?;
        AnswerComposer::commit(session, question, &result);

        Ok(AskOutcome {
            answer: result.answer,
            standalone_question: result.standalone_question,
            collection_key: handle.key,
            reused: handle.reused,
            chunks: result.chunks,
        })
    }

    /// Follow-up question against the session's active document.
    pub async fn ask_active(
        &self,
        session: &mut Session,
        question: &str,
    ) -> Result<AskOutcome, DocQaError> {
        let result = self.composer.answer(session, question).await?;
        Ok(AskOutcome {
            answer: result.answer,
            standalone_question: result.standalone_question,
            collection_key: session.collection().unwrap_or_default().to_string(),
            reused: true,
            chunks: result.chunks,
        })
    }

    async fn save_upload(&self, document: &Document) -> Result<PathBuf, DocQaError> {
        let path = upload_path(&self.upload_dir, document);
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("Failed to create upload dir: {}", self.upload_dir.display()))?;
        tokio::fs::write(&path, &document.bytes)
            .await
            .with_context(|| format!("Failed to save upload: {}", path.display()))?;
        Ok(path)
    }
}

/// `<upload_dir>/<hash prefix>-<base name>`; directory parts of the
/// client-supplied name are dropped.
fn upload_path(upload_dir: &Path, document: &Document) -> PathBuf {
    let base = Path::new(&document.file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("upload{}", document.kind.extension()));
    let prefix: String = document.content_hash.chars().take(12).collect();
    upload_dir.join(format!("{}-{}", prefix, base))
}
