//! # docqa core
//!
//! Runtime-agnostic logic for docqa: data models, the sliding-window
//! splitter, bounded conversation memory, prompt templates, the store,
//! embedder and language-model traits, and the retrieval-augmented
//! answer pipeline.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP clients.
//! Concrete backends (SQLite, OpenAI, Ollama) live in the `docqa` app
//! crate and plug in through the traits defined here.
//!
//! ## Pipeline
//!
//! ```text
//! ingest_text ──▶ VectorIndex::upsert (batches of ≤ 500)
//!
//! Session::memory ──▶ QuestionRewriter ──▶ VectorIndex::retrieve
//!                                              │
//!                 Session::memory ◀── AnswerComposer
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod store;

pub use error::DocQaError;
