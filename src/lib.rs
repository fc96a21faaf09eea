//! # docsync-rag - document folder RAG
//!
//! Keeps a folder of PDF, DOCX and plain-text documents in sync with a
//! persistent vector store, and answers questions by retrieving the most
//! relevant chunks and handing them to a hosted language model.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading and validation
//! - **[`credential`]**: API key lookup (environment, `.env`, prompt)
//! - **[`api`]**: Blocking HTTP client for the Generative Language API
//! - **[`store`]**: SQLite + sqlite-vec vector store (insert, delete, search)
//! - **[`embedder`]**: Text embedding (remote API, deterministic mock)
//! - **[`generator`]**: Text generation (remote API, recording mock)
//! - **[`indexer`]**: Loaders, text splitting, and directory synchronization
//! - **[`query`]**: Retrieval + generation, interactive question loop
//! - **[`status`]**: Per-source listing of the store

pub mod api;
pub mod config;
pub mod credential;
pub mod embedder;
pub mod generator;
pub mod indexer;
pub mod query;
pub mod status;
pub mod store;
