//! Indexing and retrieval of notebook sources

use std::sync::Arc;

use uuid::Uuid;

use super::document::{DocumentMetadata, EmbeddedDocument, ScoredDocument, VectorDocument};
use super::indexer::IndexRequest;
use super::VectorStore;
use crate::error::Result;
use crate::ingestion::TokenTextSplitter;
use crate::llm::EmbeddingModel;

/// Chunks embedded per provider call
const EMBEDDING_BATCH_SIZE: usize = 64;

/// Title stored for a source that has none
const UNTITLED: &str = "Untitled";

#[derive(Clone)]
pub struct RetrievalService {
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn EmbeddingModel>,
    splitter: TokenTextSplitter,
}

impl RetrievalService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embeddings: Arc<dyn EmbeddingModel>,
        splitter: TokenTextSplitter,
    ) -> Self {
        Self {
            store,
            embeddings,
            splitter,
        }
    }

    /// Split, embed and store a source, returning the number of chunks stored
    ///
    /// Chunks whose embedding or insert fails are logged and skipped.
    pub async fn index_source(&self, request: &IndexRequest) -> Result<usize> {
        let chunks = self.splitter.split(&request.content);
        if chunks.is_empty() {
            tracing::info!(source_id = %request.source_id, "Source produced no chunks to index");
            return Ok(0);
        }

        let title = request
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED);
        let link = request.link.clone().unwrap_or_default();

        let mut stored = 0;
        for (batch_number, batch) in chunks.chunks(EMBEDDING_BATCH_SIZE).enumerate() {
            let offset = batch_number * EMBEDDING_BATCH_SIZE;
            let embeddings = self.embed_chunks(batch).await;

            let documents: Vec<EmbeddedDocument> = batch
                .iter()
                .zip(embeddings)
                .enumerate()
                .filter_map(|(i, (chunk, embedding))| {
                    let embedding = embedding?;
                    Some(EmbeddedDocument {
                        document: VectorDocument::new(
                            chunk.clone(),
                            DocumentMetadata {
                                source_id: request.source_id,
                                notebook_id: request.notebook_id,
                                title: title.to_string(),
                                link: link.clone(),
                                chunk_index: offset + i,
                            },
                        ),
                        embedding,
                    })
                })
                .collect();

            stored += self.store_documents(documents).await;
        }

        tracing::info!(
            source_id = %request.source_id,
            chunks = chunks.len(),
            stored = stored,
            "Indexed source"
        );
        Ok(stored)
    }

    /// Embed a batch, falling back to one call per chunk if the batch fails
    async fn embed_chunks(&self, batch: &[String]) -> Vec<Option<Vec<f32>>> {
        match self.embeddings.embed_batch(batch.to_vec()).await {
            Ok(vectors) if vectors.len() == batch.len() => vectors.into_iter().map(Some).collect(),
            Ok(vectors) => {
                tracing::warn!(
                    expected = batch.len(),
                    received = vectors.len(),
                    "Embedding batch size mismatch, retrying per chunk"
                );
                self.embed_one_by_one(batch).await
            }
            Err(e) => {
                tracing::warn!("Embedding batch failed, retrying per chunk: {}", e);
                self.embed_one_by_one(batch).await
            }
        }
    }

    async fn embed_one_by_one(&self, batch: &[String]) -> Vec<Option<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(batch.len());
        for chunk in batch {
            match self.embeddings.embed(chunk).await {
                Ok(vector) => vectors.push(Some(vector)),
                Err(e) => {
                    tracing::warn!("Skipping chunk that could not be embedded: {}", e);
                    vectors.push(None);
                }
            }
        }
        vectors
    }

    /// Insert documents, falling back to one insert per document on failure
    async fn store_documents(&self, documents: Vec<EmbeddedDocument>) -> usize {
        if documents.is_empty() {
            return 0;
        }

        let count = documents.len();
        match self.store.add(documents.clone()).await {
            Ok(()) => count,
            Err(e) => {
                tracing::warn!("Batch insert failed, retrying per chunk: {}", e);
                let mut stored = 0;
                for document in documents {
                    match self.store.add(vec![document]).await {
                        Ok(()) => stored += 1,
                        Err(e) => tracing::warn!("Skipping chunk that could not be stored: {}", e),
                    }
                }
                stored
            }
        }
    }

    /// The chunks of a notebook most similar to `query`
    pub async fn retrieve(
        &self,
        notebook_id: Uuid,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embeddings.embed(query).await?;
        self.store
            .similarity_search(&embedding, top_k, notebook_id)
            .await
    }

    /// The first `limit` chunks of a notebook in document order
    pub async fn notebook_documents(
        &self,
        notebook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<VectorDocument>> {
        self.store.documents_for_notebook(notebook_id, limit).await
    }

    /// Leading chunks of a notebook joined into one context block
    ///
    /// Returns `None` when nothing is indexed or every chunk is blank.
    pub async fn notebook_context(
        &self,
        notebook_id: Uuid,
        limit: usize,
    ) -> Result<Option<String>> {
        let documents = self.notebook_documents(notebook_id, limit).await?;
        Ok(join_context(&documents))
    }

    /// Remove the chunks of a source; failures are logged, not returned
    pub async fn remove_source(&self, source_id: Uuid) {
        match self.store.delete_by_source(source_id).await {
            Ok(removed) => {
                tracing::debug!(source_id = %source_id, removed, "Removed indexed chunks")
            }
            Err(e) => {
                tracing::warn!(source_id = %source_id, "Failed to remove indexed chunks: {}", e)
            }
        }
    }

    pub async fn remove_notebook(&self, notebook_id: Uuid) -> Result<u64> {
        self.store.delete_by_notebook(notebook_id).await
    }
}

/// Join the non-blank chunk texts with a blank line
pub fn join_context(documents: &[VectorDocument]) -> Option<String> {
    let context = documents
        .iter()
        .map(|doc| doc.content.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if context.trim().is_empty() {
        None
    } else {
        Some(context)
    }
}
