//! PostgreSQL `vector` backed store

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::document::{DocumentMetadata, EmbeddedDocument, ScoredDocument, VectorDocument};
use super::VectorStore;
use crate::error::Result;
use crate::storage::Database;

/// Chunks live in the `vector_store` table; similarity is cosine distance
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    db: Database,
}

impl PgVectorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_document(row: &PgRow) -> Result<VectorDocument> {
        let Json(metadata): Json<DocumentMetadata> = row.try_get("metadata")?;
        Ok(VectorDocument {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            metadata,
        })
    }
}

/// Render an embedding as a pgvector text literal, e.g. `[0.1,0.2]`
pub fn to_vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn add(&self, documents: Vec<EmbeddedDocument>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.pool().begin().await?;
        for EmbeddedDocument { document, embedding } in &documents {
            sqlx::query(
                "INSERT INTO vector_store (id, content, metadata, embedding) \
                 VALUES ($1, $2, $3, $4::vector)",
            )
            .bind(document.id)
            .bind(&document.content)
            .bind(Json(&document.metadata))
            .bind(to_vector_literal(embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn delete_by_source(&self, source_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM vector_store WHERE metadata->>'sourceId' = $1")
            .bind(source_id.to_string())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_notebook(&self, notebook_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM vector_store WHERE metadata->>'notebookId' = $1")
            .bind(notebook_id.to_string())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        top_k: usize,
        notebook_id: Uuid,
    ) -> Result<Vec<ScoredDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content, metadata, (embedding <=> $1::vector) AS distance
            FROM vector_store
            WHERE metadata->>'notebookId' = $2
            ORDER BY distance ASC
            LIMIT $3
            "#,
        )
        .bind(to_vector_literal(embedding))
        .bind(notebook_id.to_string())
        .bind(top_k as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let distance: f64 = row.try_get("distance")?;
                Ok(ScoredDocument {
                    document: Self::row_to_document(row)?,
                    score: (1.0 - distance) as f32,
                })
            })
            .collect()
    }

    async fn documents_for_notebook(
        &self,
        notebook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<VectorDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.content, v.metadata
            FROM vector_store v
            LEFT JOIN sources s ON s.id::text = v.metadata->>'sourceId'
            WHERE v.metadata->>'notebookId' = $1
            ORDER BY s.created_at ASC NULLS LAST, (v.metadata->>'chunkIndex')::int ASC
            LIMIT $2
            "#,
        )
        .bind(notebook_id.to_string())
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::row_to_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal() {
        assert_eq!(to_vector_literal(&[0.5, -1.0, 0.25]), "[0.5,-1,0.25]");
        assert_eq!(to_vector_literal(&[]), "[]");
    }
}
