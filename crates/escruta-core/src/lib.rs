//! Escruta Core Library
//!
//! This crate provides the core functionality for Escruta, including:
//! - Storage (PostgreSQL + pgvector, versioned migrations)
//! - Accounts and access tokens
//! - Notebooks, notes and sources
//! - Source ingestion (web pages, PDF, DOCX, Markdown, HTML)
//! - Retrieval (token splitting, embeddings, similarity search)
//! - LLM integration (OpenAI-compatible API)
//! - Notebook chat, summaries and generated study material
//! - The HTTP API

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ingestion;
pub mod llm;
pub mod retrieval;
pub mod security;
pub mod services;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::storage::Database;
}
