//! Notebook chat: requests, replies and persisted memory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::Validator;
use crate::error::Result;
use crate::llm::{Message, MessageRole};

/// Width of the `chat_memory.conversation_id` column
pub const MAX_CONVERSATION_ID_LEN: usize = 36;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_input: Option<String>,
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<()> {
        Validator::new()
            .not_blank("userInput", self.user_input.as_deref())
            .max_len(
                "conversationId",
                self.conversation_id.as_deref(),
                MAX_CONVERSATION_ID_LEN,
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitedSource {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub content: String,
    pub conversation_id: Option<String>,
    pub cited_sources: Vec<CitedSource>,
}

impl ChatReply {
    /// Reply sent when the model call fails
    pub fn failure() -> Self {
        Self {
            content: "An error occurred while processing your request. Please try again."
                .to_string(),
            conversation_id: None,
            cited_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryMessageType {
    User,
    Assistant,
    System,
}

impl MemoryMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryMessageType::User => "USER",
            MemoryMessageType::Assistant => "ASSISTANT",
            MemoryMessageType::System => "SYSTEM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(MemoryMessageType::User),
            "ASSISTANT" => Some(MemoryMessageType::Assistant),
            "SYSTEM" => Some(MemoryMessageType::System),
            _ => None,
        }
    }
}

/// One stored turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMemoryMessage {
    pub conversation_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MemoryMessageType,
    pub timestamp: DateTime<Utc>,
}

impl ChatMemoryMessage {
    pub fn new(
        conversation_id: impl Into<String>,
        message_type: MemoryMessageType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            message_type,
            timestamp: Utc::now(),
        }
    }

    pub fn to_message(&self) -> Message {
        let role = match self.message_type {
            MemoryMessageType::User => MessageRole::User,
            MemoryMessageType::Assistant => MessageRole::Assistant,
            MemoryMessageType::System => MessageRole::System,
        };
        Message::new(role, self.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_rejected() {
        let request = ChatRequest {
            user_input: Some("   ".into()),
            conversation_id: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_conversation_id_must_fit_storage() {
        let fits = ChatRequest {
            user_input: Some("What is this notebook about?".into()),
            conversation_id: Some(Uuid::new_v4().to_string()),
        };
        assert!(fits.validate().is_ok());

        let too_long = ChatRequest {
            user_input: Some("What is this notebook about?".into()),
            conversation_id: Some("c".repeat(MAX_CONVERSATION_ID_LEN + 1)),
        };
        match too_long.validate().unwrap_err() {
            crate::Error::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "conversationId");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_reply() {
        let json = serde_json::to_value(ChatReply::failure()).unwrap();
        assert_eq!(json["conversationId"], serde_json::Value::Null);
        assert!(json["citedSources"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_memory_to_message() {
        let stored = ChatMemoryMessage::new("c1", MemoryMessageType::Assistant, "Hi");
        assert_eq!(stored.to_message(), Message::assistant("Hi"));
        assert_eq!(MemoryMessageType::parse("USER"), Some(MemoryMessageType::User));
    }
}
