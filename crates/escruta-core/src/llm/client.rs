//! OpenAI-compatible LLM client implementation
//!
//! Provides async HTTP client with:
//! - Chat completions (plain and JSON mode)
//! - Batched embeddings
//! - Rate limit handling with exponential backoff

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, LlmResponse, Message,
};
use super::{ChatModel, EmbeddingModel};

/// Maximum number of attempts for rate-limited requests
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BACKOFF_BASE_MS: u64 = 1000;

/// Upper bound on a single backoff sleep
const MAX_BACKOFF_MS: u64 = 30_000;

/// LLM client for chat completions and embeddings
///
/// Cheap to clone; the underlying HTTP connection pool is shared.
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.config.chat_model)
            .field("embedding_model", &self.config.embedding_model)
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the base URL from the configuration
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http_client,
            config,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn chat_model(&self) -> &str {
        &self.config.chat_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    /// Make a chat completion request with the configured chat model
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = self.chat_request(messages);
        self.execute_chat(&request).await
    }

    /// Make a chat completion request in JSON mode
    pub async fn complete_json(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = self.chat_request(messages).with_json_response();
        self.execute_chat(&request).await
    }

    /// Ask for a JSON object and deserialize it into `T`
    pub async fn complete_structured<T: super::StructuredOutput>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T> {
        super::generate_structured(self, system, user).await
    }

    fn chat_request(&self, messages: Vec<Message>) -> ChatRequest {
        ChatRequest::new(&self.config.chat_model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    async fn execute_chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response: ChatResponse = self
            .post_with_retry("chat/completions", request, Error::LLMError)
            .await?;

        LlmResponse::from_chat_response(response)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))
    }

    /// Generate an embedding for a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest::new(&self.config.embedding_model, text);
        let mut vectors = self.execute_embeddings(&request).await?;

        vectors
            .pop()
            .ok_or_else(|| Error::EmbeddingFailed("Empty embedding response".to_string()))
    }

    /// Generate embeddings for multiple texts, preserving input order
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let request = EmbeddingRequest::batch(&self.config.embedding_model, texts);
        let vectors = self.execute_embeddings(&request).await?;

        if vectors.len() != expected {
            return Err(Error::EmbeddingFailed(format!(
                "Expected {} embeddings, received {}",
                expected,
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    async fn execute_embeddings(&self, request: &EmbeddingRequest) -> Result<Vec<Vec<f32>>> {
        debug!(model = %request.model, "Sending embedding request");

        let response: EmbeddingResponse = self
            .post_with_retry("embeddings", request, Error::EmbeddingFailed)
            .await?;

        debug!(
            model = %response.model,
            tokens = response.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
            "Embeddings received"
        );

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    /// POST a JSON body, retrying with backoff while rate limited
    async fn post_with_retry<B, R, F>(&self, path: &str, body: &B, parse_error: F) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
        F: Fn(String) -> Error,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.post_once(path, body, &parse_error).await {
                Err(Error::RateLimited(wait_secs)) if attempts < MAX_RETRY_ATTEMPTS => {
                    let backoff = calculate_backoff(attempts, wait_secs);
                    warn!(
                        attempt = attempts,
                        wait_ms = backoff,
                        "Rate limited, retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                other => return other,
            }
        }
    }

    async fn post_once<B, R, F>(&self, path: &str, body: &B, parse_error: &F) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
        F: Fn(String) -> Error,
    {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for_status(status, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| parse_error(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        LlmClient::complete(self, messages).await
    }

    async fn complete_json(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        LlmClient::complete_json(self, messages).await
    }
}

#[async_trait]
impl EmbeddingModel for LlmClient {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        LlmClient::embed_batch(self, texts).await
    }
}

/// Map an unsuccessful response to an error
async fn error_for_status(status: reqwest::StatusCode, response: reqwest::Response) -> Error {
    let retry_header = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 => Error::LLMError(
            "Unauthorized: Invalid API key. Set OPENAI_API_KEY or ESCRUTA_LLM_API_KEY.".to_string(),
        ),
        429 => {
            let wait_secs = retry_header
                .or_else(|| extract_retry_after(&body))
                .unwrap_or(1);
            Error::RateLimited(wait_secs)
        }
        400 => Error::LLMError(format!("Bad request: {}", body)),
        402 => Error::LLMError("Payment required: insufficient provider credits".to_string()),
        403 => Error::LLMError(format!("Forbidden: {}", body)),
        404 => Error::LLMError(format!("Model not found or endpoint unavailable: {}", body)),
        500..=599 => Error::LLMError(format!("Server error ({}): {}", status, body)),
        _ => Error::LLMError(format!("HTTP error {}: {}", status, body)),
    }
}

/// Calculate backoff delay with jitter
fn calculate_backoff(attempt: u32, suggested_wait: u64) -> u64 {
    let base = BACKOFF_BASE_MS * 2u64.pow(attempt.saturating_sub(1));
    let suggested = suggested_wait.saturating_mul(1000);

    let delay = base.max(suggested).min(MAX_BACKOFF_MS);
    let jitter = delay / 10;
    delay + rand::random::<u64>() % jitter.max(1)
}

/// Extract retry-after value from error response
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .and_then(|v| v.as_u64())
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|v| v.as_u64())
        })
}
