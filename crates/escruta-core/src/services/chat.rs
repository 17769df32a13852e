//! Retrieval-augmented chat, notebook summaries and example questions

use std::sync::Arc;

use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::domain::tools::{ExampleQuestions, SummaryResponse};
use crate::domain::{ChatMemoryMessage, ChatReply, ChatRequest, CitedSource, MemoryMessageType};
use crate::error::{Error, Result};
use crate::infrastructure::{ChatMemoryStore, NotebookRepository, PgChatMemory, SourceRepository};
use crate::llm::{self, ChatModel, Message};
use crate::retrieval::{RetrievalService, ScoredDocument};
use crate::storage::Database;

const SYSTEM_MESSAGE: &str = "\
You are a helpful AI assistant. Answer questions using ONLY the provided sources.

RULES:
1. Provide clear, comprehensive answers based on the available sources
2. Write in a natural, conversational tone
3. Use simple formatting only: **bold**, *italic*, `code`
4. Focus on directly answering the user's question with the information from the sources";

const SUMMARY_SYSTEM_MESSAGE: &str = "\
Write a summary paragraph of 4-5 lines about the content provided.

RULES:
- Use **bold** for key terms and *italic* for emphasis (sparingly)
- Write as if explaining the topic directly, not describing the sources
- Do NOT start with \"The articles...\", \"The sources...\", \"This content...\" or similar
- Start directly with the subject matter (e.g., \"Quantum computing is...\")
- Define or mention the main concepts";

const EXAMPLE_QUESTIONS_PROMPT: &str = "\
Generate exactly 3 questions based on this text.

RULES:
- Questions must be about the SUBJECT MATTER, not about the text itself
- Do NOT mention \"article\", \"document\", \"text\", \"source\", or \"Wikipedia\"
- Do NOT ask what the topic is or what is covered
- Ask questions that someone studying this subject would ask
- Each question must be answerable using ONLY the provided information";

pub const NO_CONTEXT_MESSAGE: &str = "No sources available or content not yet indexed.";

/// Chunks used as context for a notebook summary
const SUMMARY_CONTEXT_CHUNKS: usize = 5;

/// Chunks used as context for example questions
const QUESTIONS_CONTEXT_CHUNKS: usize = 3;

const MAX_EXAMPLE_QUESTIONS: usize = 3;

#[derive(Clone)]
pub struct ChatService {
    db: Database,
    memory: Arc<dyn ChatMemoryStore>,
    chat: Arc<dyn ChatModel>,
    retrieval: RetrievalService,
    config: RetrievalConfig,
}

impl ChatService {
    pub fn new(
        db: Database,
        chat: Arc<dyn ChatModel>,
        retrieval: RetrievalService,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            memory: Arc::new(PgChatMemory::new(db.clone())),
            db,
            chat,
            retrieval,
            config,
        }
    }

    /// Keep conversations somewhere other than the database
    pub fn with_memory(mut self, memory: Arc<dyn ChatMemoryStore>) -> Self {
        self.memory = memory;
        self
    }

    /// Answer a question from the notebook's sources and remember the turn
    pub async fn chat(&self, notebook_id: Uuid, request: ChatRequest) -> Result<ChatReply> {
        request.validate()?;

        let input = request.user_input.unwrap_or_default();
        let conversation_id = request
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let history = self
            .memory
            .list_recent(notebook_id, &conversation_id, self.config.memory_window)
            .await?;
        let retrieved = self
            .retrieval
            .retrieve(notebook_id, &input, self.config.top_k)
            .await?;

        tracing::debug!(
            notebook_id = %notebook_id,
            conversation_id = %conversation_id,
            history = history.len(),
            retrieved = retrieved.len(),
            "Answering chat message"
        );

        let messages = build_prompt(&history, &input, &retrieved);
        let response = self.chat.complete(messages).await?;

        self.memory
            .append(
                notebook_id,
                &[
                    ChatMemoryMessage::new(&conversation_id, MemoryMessageType::User, &input),
                    ChatMemoryMessage::new(
                        &conversation_id,
                        MemoryMessageType::Assistant,
                        &response.content,
                    ),
                ],
            )
            .await?;
        self.memory
            .trim(notebook_id, &conversation_id, self.config.memory_window)
            .await?;

        Ok(ChatReply {
            content: response.content,
            conversation_id: Some(conversation_id),
            cited_sources: cited_sources(&retrieved),
        })
    }

    /// Stored messages of a conversation, oldest first
    pub async fn history(
        &self,
        notebook_id: Uuid,
        conversation_id: &str,
    ) -> Result<Vec<ChatMemoryMessage>> {
        self.memory.list(notebook_id, conversation_id).await
    }

    pub async fn clear_history(&self, notebook_id: Uuid, conversation_id: &str) -> Result<u64> {
        let removed = self.memory.delete(notebook_id, conversation_id).await?;
        tracing::debug!(
            notebook_id = %notebook_id,
            conversation_id,
            removed,
            "Cleared conversation"
        );
        Ok(removed)
    }

    /// Generate and persist a notebook summary
    pub async fn generate_summary(&self, notebook_id: Uuid) -> Result<String> {
        let context = self
            .notebook_context(notebook_id, SUMMARY_CONTEXT_CHUNKS)
            .await?
            .ok_or_else(|| Error::NoContent(NO_CONTEXT_MESSAGE.to_string()))?;

        let response: SummaryResponse = llm::generate_structured(
            self.chat.as_ref(),
            SUMMARY_SYSTEM_MESSAGE,
            &format!("Write a summary paragraph about this:\n\n{}", context),
        )
        .await?;

        NotebookRepository::new(&self.db)
            .set_summary(notebook_id, Some(&response.summary))
            .await?;

        tracing::info!(notebook_id = %notebook_id, "Generated notebook summary");
        Ok(response.summary)
    }

    /// Stored notebook summary; empty when none has been generated
    pub async fn summary(&self, notebook_id: Uuid) -> Result<String> {
        let notebook = NotebookRepository::new(&self.db)
            .get(notebook_id)
            .await?
            .ok_or_else(|| Error::NotFound("Notebook".to_string()))?;

        Ok(notebook
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_default())
    }

    pub async fn example_questions(&self, notebook_id: Uuid) -> Result<ExampleQuestions> {
        let context = self
            .notebook_context(notebook_id, QUESTIONS_CONTEXT_CHUNKS)
            .await?
            .ok_or_else(|| Error::NoContent(NO_CONTEXT_MESSAGE.to_string()))?;

        let questions: ExampleQuestions = llm::generate_structured(
            self.chat.as_ref(),
            "",
            &format!("{}\n\n{}", EXAMPLE_QUESTIONS_PROMPT, context),
        )
        .await?;

        Ok(questions.limited(MAX_EXAMPLE_QUESTIONS))
    }

    async fn notebook_context(&self, notebook_id: Uuid, limit: usize) -> Result<Option<String>> {
        if !SourceRepository::new(&self.db)
            .exists_in_notebook(notebook_id)
            .await?
        {
            return Ok(None);
        }
        self.retrieval.notebook_context(notebook_id, limit).await
    }
}

/// System message, replayed history and the question wrapped with its context
pub fn build_prompt(
    history: &[ChatMemoryMessage],
    input: &str,
    retrieved: &[ScoredDocument],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(SYSTEM_MESSAGE));
    messages.extend(history.iter().map(ChatMemoryMessage::to_message));
    messages.push(Message::user(augment_question(input, retrieved)));
    messages
}

fn augment_question(input: &str, retrieved: &[ScoredDocument]) -> String {
    let context = retrieved
        .iter()
        .map(|scored| scored.document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{input}\n\n\
         Context information is below, surrounded by ---------------------\n\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\n\
         Given the context and provided history information and not prior knowledge,\n\
         reply to the user comment. If the answer is not in the context, inform\n\
         the user that you can't answer the question."
    )
}

/// Distinct sources of the retrieved chunks, in retrieval order
pub fn cited_sources(retrieved: &[ScoredDocument]) -> Vec<CitedSource> {
    let mut cited: Vec<CitedSource> = Vec::new();
    for scored in retrieved {
        let metadata = &scored.document.metadata;
        let source = CitedSource {
            id: metadata.source_id,
            title: metadata.title.clone(),
        };
        if !cited.contains(&source) {
            cited.push(source);
        }
    }
    cited
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::infrastructure::InMemoryChatMemory;
    use crate::ingestion::TokenTextSplitter;
    use crate::llm::{EmbeddingModel, LlmResponse, MessageRole};
    use crate::retrieval::{DocumentMetadata, MemoryVectorStore, VectorDocument};
    use crate::storage::DatabaseConfig;

    /// Answers every turn and keeps the prompts it was sent
    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ChatModel for RecordingModel {
        async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
            let turn = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(messages);
                prompts.len() - 1
            };
            Ok(LlmResponse::text(format!("Answer {}", turn)))
        }
    }

    struct FlatEmbeddings;

    #[async_trait]
    impl EmbeddingModel for FlatEmbeddings {
        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    /// A chat service that never touches PostgreSQL
    fn offline_service(model: Arc<RecordingModel>, config: RetrievalConfig) -> ChatService {
        let db = Database::connect_lazy(
            &DatabaseConfig::with_url("postgres://escruta@127.0.0.1:1/escruta").no_migrate(),
        )
        .unwrap();
        let retrieval = RetrievalService::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(FlatEmbeddings),
            TokenTextSplitter::new().unwrap(),
        );
        ChatService::new(db, model, retrieval, config)
            .with_memory(Arc::new(InMemoryChatMemory::new()))
    }

    fn ask(input: &str, conversation_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            user_input: Some(input.to_string()),
            conversation_id: conversation_id.map(str::to_string),
        }
    }

    fn scored(source_id: Uuid, title: &str, content: &str, score: f32) -> ScoredDocument {
        ScoredDocument {
            document: VectorDocument::new(
                content,
                DocumentMetadata {
                    source_id,
                    notebook_id: Uuid::nil(),
                    title: title.to_string(),
                    link: String::new(),
                    chunk_index: 0,
                },
            ),
            score,
        }
    }

    #[test]
    fn test_prompt_layout() {
        let history = vec![
            ChatMemoryMessage::new("c", MemoryMessageType::User, "Earlier question"),
            ChatMemoryMessage::new("c", MemoryMessageType::Assistant, "Earlier answer"),
        ];
        let retrieved = vec![
            scored(Uuid::new_v4(), "Rust", "Ownership moves values.", 0.9),
            scored(Uuid::new_v4(), "Book", "Borrowing lends them.", 0.8),
        ];

        let messages = build_prompt(&history, "What is ownership?", &retrieved);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("ONLY the provided sources"));
        assert_eq!(messages[1], Message::user("Earlier question"));
        assert_eq!(messages[2], Message::assistant("Earlier answer"));

        let question = &messages[3].content;
        assert!(question.starts_with("What is ownership?\n\nContext information is below"));
        assert!(question.contains(
            "---------------------\nOwnership moves values.\nBorrowing lends them.\n---------------------"
        ));
        assert!(question.ends_with("you can't answer the question."));
    }

    #[test]
    fn test_prompt_without_context() {
        let messages = build_prompt(&[], "Hello?", &[]);
        assert_eq!(messages.len(), 2);
        assert!(messages[1]
            .content
            .contains("---------------------\n\n---------------------"));
    }

    #[tokio::test]
    async fn test_memory_window_after_many_turns() {
        let model = Arc::new(RecordingModel::default());
        let config = RetrievalConfig::default();
        let window = config.memory_window;
        let service = offline_service(model.clone(), config);
        let notebook_id = Uuid::new_v4();

        let first = service
            .chat(notebook_id, ask("Question 0", None))
            .await
            .unwrap();
        let conversation_id = first.conversation_id.unwrap();
        for turn in 1..12 {
            let reply = service
                .chat(notebook_id, ask(&format!("Question {}", turn), Some(&conversation_id)))
                .await
                .unwrap();
            assert_eq!(reply.content, format!("Answer {}", turn));
        }

        let history = service.history(notebook_id, &conversation_id).await.unwrap();
        assert_eq!(history.len(), window);
        assert_eq!(history[0].content, "Question 7");
        assert_eq!(history[0].message_type, MemoryMessageType::User);
        assert_eq!(history[window - 1].content, "Answer 11");

        // System message, the windowed history, then the new question
        let prompts = model.prompts.lock().unwrap();
        let last = prompts.last().unwrap();
        assert_eq!(last.len(), window + 2);
        assert_eq!(last[1], Message::user("Question 6"));
        assert_eq!(last[window], Message::assistant("Answer 10"));
        assert!(last[window + 1].content.starts_with("Question 11"));
    }

    #[tokio::test]
    async fn test_clear_history_forgets_conversation() {
        let service = offline_service(Arc::default(), RetrievalConfig::default());
        let notebook_id = Uuid::new_v4();

        let reply = service
            .chat(notebook_id, ask("Hello", Some("conversation-1")))
            .await
            .unwrap();
        assert_eq!(reply.conversation_id.as_deref(), Some("conversation-1"));
        assert!(reply.cited_sources.is_empty());

        assert_eq!(service.clear_history(notebook_id, "conversation-1").await.unwrap(), 2);
        assert!(service.history(notebook_id, "conversation-1").await.unwrap().is_empty());
    }

    #[test]
    fn test_cited_sources_are_distinct_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let retrieved = vec![
            scored(b, "Second", "x", 0.9),
            scored(a, "First", "y", 0.8),
            scored(b, "Second", "z", 0.7),
        ];

        assert_eq!(
            cited_sources(&retrieved),
            vec![
                CitedSource {
                    id: b,
                    title: "Second".into()
                },
                CitedSource {
                    id: a,
                    title: "First".into()
                },
            ]
        );
    }
}
