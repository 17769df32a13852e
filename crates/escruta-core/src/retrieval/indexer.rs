//! Background indexing of new sources

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::service::RetrievalService;

/// Everything needed to index one source
#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub notebook_id: Uuid,
    pub source_id: Uuid,
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: String,
}

/// Runs indexing on the Tokio runtime so requests return immediately
#[derive(Clone)]
pub struct Indexer {
    retrieval: RetrievalService,
}

impl Indexer {
    pub fn new(retrieval: RetrievalService) -> Self {
        Self { retrieval }
    }

    /// Index a source in the background; failures are logged
    pub fn spawn(&self, request: IndexRequest) -> JoinHandle<()> {
        let retrieval = self.retrieval.clone();

        tokio::spawn(async move {
            match retrieval.index_source(&request).await {
                Ok(stored) => tracing::debug!(
                    source_id = %request.source_id,
                    stored,
                    "Background indexing finished"
                ),
                Err(e) => tracing::error!(
                    source_id = %request.source_id,
                    "Background indexing failed: {}",
                    e
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::ingestion::TokenTextSplitter;
    use crate::llm::EmbeddingModel;
    use crate::retrieval::MemoryVectorStore;

    struct UnitEmbeddings;

    #[async_trait]
    impl EmbeddingModel for UnitEmbeddings {
        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_spawned_indexing_completes() {
        let store = Arc::new(MemoryVectorStore::new());
        let retrieval = RetrievalService::new(
            store.clone(),
            Arc::new(UnitEmbeddings),
            TokenTextSplitter::new().unwrap(),
        );
        let indexer = Indexer::new(retrieval);

        indexer
            .spawn(IndexRequest {
                notebook_id: Uuid::new_v4(),
                source_id: Uuid::new_v4(),
                title: Some("Notes".into()),
                link: None,
                content: "A short but meaningful paragraph about ownership.".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
    }
}
