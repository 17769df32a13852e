//! Chat memory repository
//!
//! Conversations are windowed: after each exchange only the most recent
//! messages of a conversation are kept.

use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::Result;
use crate::domain::{ChatMemoryMessage, MemoryMessageType};
use crate::infrastructure::decode_enum;
use crate::storage::Database;

/// Chat memory repository for database operations
pub struct ChatMemoryRepository<'a> {
    db: &'a Database,
}

impl<'a> ChatMemoryRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append messages in order within one transaction
    pub async fn append(&self, notebook_id: Uuid, messages: &[ChatMemoryMessage]) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_memory (conversation_id, notebook_id, content, type, "timestamp")
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&message.conversation_id)
            .bind(notebook_id)
            .bind(&message.content)
            .bind(message.message_type.as_str())
            .bind(message.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get the most recent messages of a conversation in chronological order
    pub async fn list_recent(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMemoryMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT conversation_id, content, type, "timestamp" FROM chat_memory
            WHERE notebook_id = $1 AND conversation_id = $2
            ORDER BY sequence DESC LIMIT $3
            "#,
        )
        .bind(notebook_id)
        .bind(conversation_id)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        let mut messages = rows
            .into_iter()
            .map(|r| self.row_to_message(r))
            .collect::<Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// All stored messages of a conversation, oldest first
    pub async fn list(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
    ) -> Result<Vec<ChatMemoryMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT conversation_id, content, type, "timestamp" FROM chat_memory
            WHERE notebook_id = $1 AND conversation_id = $2
            ORDER BY sequence ASC
            "#,
        )
        .bind(notebook_id)
        .bind(conversation_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(|r| self.row_to_message(r)).collect()
    }

    /// Drop everything but the newest `keep` messages of a conversation
    pub async fn trim(&self, notebook_id: Uuid, conversation_id: &str, keep: usize) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM chat_memory
            WHERE notebook_id = $1 AND conversation_id = $2 AND sequence NOT IN (
                SELECT sequence FROM chat_memory
                WHERE notebook_id = $1 AND conversation_id = $2
                ORDER BY sequence DESC LIMIT $3
            )
            "#,
        )
        .bind(notebook_id)
        .bind(conversation_id)
        .bind(keep as i64)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a conversation, returning how many messages were removed
    pub async fn delete(&self, notebook_id: Uuid, conversation_id: &str) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM chat_memory WHERE notebook_id = $1 AND conversation_id = $2")
                .bind(notebook_id)
                .bind(conversation_id)
                .execute(self.db.pool())
                .await?;

        Ok(result.rows_affected())
    }

    fn row_to_message(&self, row: PgRow) -> Result<ChatMemoryMessage> {
        Ok(ChatMemoryMessage {
            conversation_id: row.get("conversation_id"),
            content: row.get("content"),
            message_type: decode_enum("type", row.get("type"), MemoryMessageType::parse)?,
            timestamp: row.get("timestamp"),
        })
    }
}
