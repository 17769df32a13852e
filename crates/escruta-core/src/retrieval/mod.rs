//! Retrieval over embedded source chunks
//!
//! Source text is split, embedded and stored with metadata naming its
//! notebook and source. Chat and generation read it back either by
//! similarity to a question or in document order.

pub mod document;
pub mod indexer;
pub mod memory;
pub mod pgvector;
pub mod service;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

pub use document::{DocumentMetadata, EmbeddedDocument, ScoredDocument, VectorDocument};
pub use indexer::{IndexRequest, Indexer};
pub use memory::MemoryVectorStore;
pub use pgvector::PgVectorStore;
pub use service::{RetrievalService, join_context};

/// Storage of embedded chunks
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store documents with their embeddings
    async fn add(&self, documents: Vec<EmbeddedDocument>) -> Result<()>;

    /// Remove every chunk of a source
    async fn delete_by_source(&self, source_id: Uuid) -> Result<u64>;

    /// Remove every chunk of a notebook
    async fn delete_by_notebook(&self, notebook_id: Uuid) -> Result<u64>;

    /// The `top_k` chunks of a notebook closest to `embedding`, best first
    async fn similarity_search(
        &self,
        embedding: &[f32],
        top_k: usize,
        notebook_id: Uuid,
    ) -> Result<Vec<ScoredDocument>>;

    /// The first `limit` chunks of a notebook, by source age then chunk index
    async fn documents_for_notebook(
        &self,
        notebook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<VectorDocument>>;
}
