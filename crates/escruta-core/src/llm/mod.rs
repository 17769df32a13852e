//! LLM integration
//!
//! OpenAI-compatible client plus the two seams the rest of the crate depends on:
//! [`ChatModel`] for completions and [`EmbeddingModel`] for vectors.

pub mod client;
pub mod structured;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{LlmClient, LlmClientBuilder};
pub use structured::{StructuredOutput, parse_structured};
pub use types::{LlmResponse, Message, MessageRole};

/// Something that answers chat completions
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse>;

    /// Completion constrained to a JSON object
    async fn complete_json(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        self.complete(messages).await
    }
}

/// Something that turns texts into embedding vectors
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a batch, returning vectors in input order
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            crate::Error::EmbeddingFailed("Empty embedding response".to_string())
        })
    }
}

/// Ask the model for a `T`, appending its JSON shape to the system prompt
pub async fn generate_structured<T: StructuredOutput>(
    model: &dyn ChatModel,
    system: &str,
    user: &str,
) -> Result<T> {
    let system = if system.trim().is_empty() {
        T::format_instructions()
    } else {
        format!("{}\n\n{}", system.trim_end(), T::format_instructions())
    };
    let response = model
        .complete_json(vec![Message::system(system), Message::user(user)])
        .await?;
    parse_structured(&response.content)
}

/// Single-turn completion returning only the text
pub async fn generate_text(model: &dyn ChatModel, system: &str, user: &str) -> Result<String> {
    let response = model
        .complete(vec![Message::system(system), Message::user(user)])
        .await?;
    Ok(response.content)
}
