//! # docqa
//!
//! Upload a document, ask questions about it. A retrieval-augmented
//! question-answering backend with per-session conversational memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Upload  │──▶│ Extract+Split │──▶│ SQLite store │
//! │ txt/pdf… │   │  Embed (×500) │   │ collections  │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │
//!    question ─▶ rewrite ─▶ retrieve ◀─────┘
//!                              │
//!                              ▼
//!                     ground + generate ─▶ memory
//! ```
//!
//! The runtime-agnostic pieces (splitter, memory, prompts, pipeline) live
//! in [`docqa_core`]; this crate adds configuration, persistence,
//! providers, extraction, the CLI and the HTTP server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | tracing subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`records`] | Upload log |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Chat-completion providers |
//! | [`extract`] | Text extraction per format |
//! | [`service`] | Ingest-and-answer flow |
//! | [`sessions`] | Session registry |
//! | [`server`] | HTTP server |
//! | [`commands`] | CLI commands |

pub mod commands;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod records;
pub mod server;
pub mod service;
pub mod sessions;
pub mod sqlite_store;

pub use docqa_core;
