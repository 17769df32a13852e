//! In-process vector store
//!
//! Keeps chunks in memory and scores them with cosine similarity. Used when
//! no database is wanted, such as in tests and local experiments.

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::document::{EmbeddedDocument, ScoredDocument, VectorDocument};
use super::VectorStore;
use crate::error::{Error, Result};

/// Cosine similarity of two vectors; 0.0 when either is empty or zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    // Insertion order stands in for source age
    documents: RwLock<Vec<EmbeddedDocument>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> Error {
        Error::Other("Vector store lock poisoned".to_string())
    }

    fn retain(&self, keep: impl Fn(&EmbeddedDocument) -> bool) -> Result<u64> {
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;
        let before = documents.len();
        documents.retain(|doc| keep(doc));
        Ok((before - documents.len()) as u64)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, documents: Vec<EmbeddedDocument>) -> Result<()> {
        self.documents
            .write()
            .map_err(|_| Self::poisoned())?
            .extend(documents);
        Ok(())
    }

    async fn delete_by_source(&self, source_id: Uuid) -> Result<u64> {
        self.retain(|doc| doc.document.metadata.source_id != source_id)
    }

    async fn delete_by_notebook(&self, notebook_id: Uuid) -> Result<u64> {
        self.retain(|doc| doc.document.metadata.notebook_id != notebook_id)
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        top_k: usize,
        notebook_id: Uuid,
    ) -> Result<Vec<ScoredDocument>> {
        let documents = self.documents.read().map_err(|_| Self::poisoned())?;

        let mut hits: Vec<ScoredDocument> = documents
            .iter()
            .filter(|doc| doc.document.metadata.notebook_id == notebook_id)
            .map(|doc| ScoredDocument {
                document: doc.document.clone(),
                score: cosine_similarity(embedding, &doc.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn documents_for_notebook(
        &self,
        notebook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<VectorDocument>> {
        let documents = self.documents.read().map_err(|_| Self::poisoned())?;

        let mut selected: Vec<(usize, &EmbeddedDocument)> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.document.metadata.notebook_id == notebook_id)
            .collect();

        // Group by the first appearance of each source, then chunk order
        let mut first_seen: Vec<Uuid> = Vec::new();
        for (_, doc) in &selected {
            let source = doc.document.metadata.source_id;
            if !first_seen.contains(&source) {
                first_seen.push(source);
            }
        }
        selected.sort_by_key(|(position, doc)| {
            let source_rank = first_seen
                .iter()
                .position(|s| *s == doc.document.metadata.source_id)
                .unwrap_or(usize::MAX);
            (source_rank, doc.document.metadata.chunk_index, *position)
        });

        Ok(selected
            .into_iter()
            .take(limit)
            .map(|(_, doc)| doc.document.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::DocumentMetadata;

    fn doc(
        notebook_id: Uuid,
        source_id: Uuid,
        index: usize,
        embedding: Vec<f32>,
    ) -> EmbeddedDocument {
        EmbeddedDocument {
            document: VectorDocument::new(
                format!("chunk {index}"),
                DocumentMetadata {
                    source_id,
                    notebook_id,
                    title: "T".into(),
                    link: String::new(),
                    chunk_index: index,
                },
            ),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_is_scoped_and_ranked() {
        let store = MemoryVectorStore::new();
        let (notebook, other) = (Uuid::new_v4(), Uuid::new_v4());
        let source = Uuid::new_v4();

        store
            .add(vec![
                doc(notebook, source, 0, vec![1.0, 0.0]),
                doc(notebook, source, 1, vec![0.7, 0.7]),
                doc(other, Uuid::new_v4(), 0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.similarity_search(&[0.0, 1.0], 5, notebook).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.metadata.chunk_index, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_documents_for_notebook_order_and_delete() {
        let store = MemoryVectorStore::new();
        let notebook = Uuid::new_v4();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .add(vec![
                doc(notebook, first, 1, vec![1.0]),
                doc(notebook, second, 0, vec![1.0]),
                doc(notebook, first, 0, vec![1.0]),
            ])
            .await
            .unwrap();

        let docs = store.documents_for_notebook(notebook, 2).await.unwrap();
        let order: Vec<_> = docs
            .iter()
            .map(|d| (d.metadata.source_id, d.metadata.chunk_index))
            .collect();
        assert_eq!(order, vec![(first, 0), (first, 1)]);

        assert_eq!(store.delete_by_source(first).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.delete_by_notebook(notebook).await.unwrap(), 1);
        assert!(store.is_empty());
    }
}
