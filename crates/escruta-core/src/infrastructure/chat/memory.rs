//! Chat memory backends
//!
//! `ChatService` reads and windows conversations through [`ChatMemoryStore`];
//! PostgreSQL backs it in the server and a map backs it in tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::repository::ChatMemoryRepository;
use crate::domain::ChatMemoryMessage;
use crate::error::{Error, Result};
use crate::storage::Database;

/// Windowed storage of conversation turns, scoped by notebook
#[async_trait]
pub trait ChatMemoryStore: Send + Sync {
    /// Append messages in order
    async fn append(&self, notebook_id: Uuid, messages: &[ChatMemoryMessage]) -> Result<()>;

    /// The newest `limit` messages, oldest first
    async fn list_recent(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMemoryMessage>>;

    /// Every stored message, oldest first
    async fn list(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
    ) -> Result<Vec<ChatMemoryMessage>>;

    /// Keep only the newest `keep` messages
    async fn trim(&self, notebook_id: Uuid, conversation_id: &str, keep: usize) -> Result<u64>;

    async fn delete(&self, notebook_id: Uuid, conversation_id: &str) -> Result<u64>;
}

/// Chat memory in the `chat_memory` table
#[derive(Clone)]
pub struct PgChatMemory {
    db: Database,
}

impl PgChatMemory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatMemoryStore for PgChatMemory {
    async fn append(&self, notebook_id: Uuid, messages: &[ChatMemoryMessage]) -> Result<()> {
        ChatMemoryRepository::new(&self.db)
            .append(notebook_id, messages)
            .await
    }

    async fn list_recent(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMemoryMessage>> {
        ChatMemoryRepository::new(&self.db)
            .list_recent(notebook_id, conversation_id, limit)
            .await
    }

    async fn list(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
    ) -> Result<Vec<ChatMemoryMessage>> {
        ChatMemoryRepository::new(&self.db)
            .list(notebook_id, conversation_id)
            .await
    }

    async fn trim(&self, notebook_id: Uuid, conversation_id: &str, keep: usize) -> Result<u64> {
        ChatMemoryRepository::new(&self.db)
            .trim(notebook_id, conversation_id, keep)
            .await
    }

    async fn delete(&self, notebook_id: Uuid, conversation_id: &str) -> Result<u64> {
        ChatMemoryRepository::new(&self.db)
            .delete(notebook_id, conversation_id)
            .await
    }
}

/// In-process chat memory for tests and local experiments
#[derive(Debug, Default)]
pub struct InMemoryChatMemory {
    conversations: RwLock<HashMap<(Uuid, String), Vec<ChatMemoryMessage>>>,
}

impl InMemoryChatMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> Error {
        Error::Other("Chat memory lock poisoned".to_string())
    }

    fn key(notebook_id: Uuid, conversation_id: &str) -> (Uuid, String) {
        (notebook_id, conversation_id.to_string())
    }
}

#[async_trait]
impl ChatMemoryStore for InMemoryChatMemory {
    async fn append(&self, notebook_id: Uuid, messages: &[ChatMemoryMessage]) -> Result<()> {
        let mut conversations = self.conversations.write().map_err(|_| Self::poisoned())?;
        for message in messages {
            conversations
                .entry(Self::key(notebook_id, &message.conversation_id))
                .or_default()
                .push(message.clone());
        }
        Ok(())
    }

    async fn list_recent(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMemoryMessage>> {
        let conversations = self.conversations.read().map_err(|_| Self::poisoned())?;
        let messages = conversations
            .get(&Self::key(notebook_id, conversation_id))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn list(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
    ) -> Result<Vec<ChatMemoryMessage>> {
        let conversations = self.conversations.read().map_err(|_| Self::poisoned())?;
        Ok(conversations
            .get(&Self::key(notebook_id, conversation_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn trim(&self, notebook_id: Uuid, conversation_id: &str, keep: usize) -> Result<u64> {
        let mut conversations = self.conversations.write().map_err(|_| Self::poisoned())?;
        let Some(messages) = conversations.get_mut(&Self::key(notebook_id, conversation_id)) else {
            return Ok(0);
        };
        let excess = messages.len().saturating_sub(keep);
        messages.drain(..excess);
        Ok(excess as u64)
    }

    async fn delete(&self, notebook_id: Uuid, conversation_id: &str) -> Result<u64> {
        let mut conversations = self.conversations.write().map_err(|_| Self::poisoned())?;
        Ok(conversations
            .remove(&Self::key(notebook_id, conversation_id))
            .map(|messages| messages.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemoryMessageType;

    fn user(conversation_id: &str, content: &str) -> ChatMemoryMessage {
        ChatMemoryMessage::new(conversation_id, MemoryMessageType::User, content)
    }

    #[tokio::test]
    async fn test_recent_and_trim_keep_newest() {
        let memory = InMemoryChatMemory::new();
        let notebook_id = Uuid::new_v4();
        let messages: Vec<_> = (0..5).map(|i| user("c", &format!("m{}", i))).collect();
        memory.append(notebook_id, &messages).await.unwrap();

        let recent = memory.list_recent(notebook_id, "c", 2).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);

        assert_eq!(memory.trim(notebook_id, "c", 3).await.unwrap(), 2);
        assert_eq!(memory.list(notebook_id, "c").await.unwrap()[0].content, "m2");
        assert_eq!(memory.trim(notebook_id, "missing", 3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_conversations_scoped_by_notebook() {
        let memory = InMemoryChatMemory::new();
        let notebook_id = Uuid::new_v4();
        memory.append(notebook_id, &[user("shared", "hello")]).await.unwrap();

        assert!(memory.list(Uuid::new_v4(), "shared").await.unwrap().is_empty());
        assert_eq!(memory.delete(notebook_id, "shared").await.unwrap(), 1);
        assert!(memory.list(notebook_id, "shared").await.unwrap().is_empty());
    }
}
