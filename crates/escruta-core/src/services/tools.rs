//! Background generation of study material

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::job::GenerationAccepted;
use crate::domain::tools::{Flashcards, MindMap, Questionnaire, StudyGuide};
use crate::domain::{GenerationJob, JobStatus, JobType};
use crate::error::{Error, Result};
use crate::infrastructure::{JobRepository, NotebookRepository, SourceRepository};
use crate::llm::{self, ChatModel, StructuredOutput};
use crate::retrieval::{RetrievalService, join_context};
use crate::storage::Database;

/// Chunks of a notebook fed to a generation job
const CONTEXT_CHUNKS: usize = 10;

const STUDY_GUIDE_PROMPT: &str = "\
You are an expert educator. Create a comprehensive study guide based on the provided content.

The study guide must include:
- overview: A brief introduction to the topic (2-3 sentences)
- keyConcepts: List of key terms with their definitions
- importantDetails: List of supporting information and examples
- connections: List of how concepts relate to each other
- reviewQuestions: List of questions to test understanding";

const FLASHCARDS_PROMPT: &str = "\
You are an expert educator. Create flashcards for effective spaced repetition learning.

Create 10-15 flashcards covering the most important concepts.
Each flashcard has:
- front: A question or term
- back: The answer or definition (concise but complete)";

const QUESTIONNAIRE_PROMPT: &str = "\
You are an expert educator. Create a comprehensive questionnaire to test understanding.

Create 10-12 questions with a mix of types:
- type: \"multiple_choice\", \"true_false\", or \"short_answer\"
- question: The question text
- options: List of options (only for multiple_choice, use null otherwise)
- correctAnswerIndex: Index of correct option (only for multiple_choice, use null otherwise)
- correctAnswerBoolean: true/false (only for true_false, use null otherwise)
- sampleAnswer: Expected answer (only for short_answer, use null otherwise)
- explanation: Why this answer is correct

Include a title for the questionnaire.";

const MIND_MAP_PROMPT: &str = "\
You are an expert at creating mind maps. Analyze the content and create a hierarchical mind map structure.

The mind map must have:
- central: The main topic
- branches: List of main branches, each with:
  - label: The branch name
  - children: List of sub-branches (can be nested)

Create a well-organized mind map with 4-6 main branches and relevant sub-topics.";

#[derive(Clone)]
pub struct ToolsService {
    db: Database,
    chat: Arc<dyn ChatModel>,
    retrieval: RetrievalService,
}

impl ToolsService {
    pub fn new(db: Database, chat: Arc<dyn ChatModel>, retrieval: RetrievalService) -> Self {
        Self {
            db,
            chat,
            retrieval,
        }
    }

    /// Queue a job and process it in the background
    pub async fn start(
        &self,
        notebook_id: Uuid,
        user_id: Uuid,
        job_type: JobType,
    ) -> Result<GenerationAccepted> {
        let job = self.create_job(notebook_id, user_id, job_type).await?;
        self.spawn(job.id);
        Ok(GenerationAccepted::new(job.id))
    }

    /// Persist a pending job, refusing a second active job of the same type
    pub async fn create_job(
        &self,
        notebook_id: Uuid,
        user_id: Uuid,
        job_type: JobType,
    ) -> Result<GenerationJob> {
        if !NotebookRepository::new(&self.db).exists(notebook_id).await? {
            return Err(Error::InvalidInput("Notebook not found".to_string()));
        }

        let repo = JobRepository::new(&self.db);
        if repo
            .latest_with_status(notebook_id, user_id, job_type, &JobStatus::ACTIVE)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "A job of this type is already in progress".to_string(),
            ));
        }

        let job = GenerationJob::new(notebook_id, user_id, job_type);
        repo.create(&job).await?;

        tracing::info!(
            job_id = %job.id,
            notebook_id = %notebook_id,
            job_type = %job_type,
            "Queued generation job"
        );
        Ok(job)
    }

    pub fn spawn(&self, job_id: Uuid) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move { service.process_job(job_id).await })
    }

    /// Run a job to completion, recording the result or the failure
    pub async fn process_job(&self, job_id: Uuid) {
        let repo = JobRepository::new(&self.db);

        let mut job = match repo.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(job_id = %job_id, "Generation job disappeared before processing");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, "Failed to load generation job: {}", e);
                return;
            }
        };

        if !job.status.is_active() {
            tracing::debug!(
                job_id = %job_id,
                status = job.status.as_str(),
                "Generation job already finished"
            );
            return;
        }

        job.mark_processing();
        if let Err(e) = repo.update(&job).await {
            tracing::error!(job_id = %job_id, "Failed to mark job as processing: {}", e);
            return;
        }

        match self.generate(job.notebook_id, job.job_type).await {
            Ok(result) => {
                tracing::info!(job_id = %job_id, "Generation job completed");
                job.mark_completed(result);
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, "Generation job failed: {}", e);
                job.mark_failed(e.to_string());
            }
        }

        if let Err(e) = repo.update(&job).await {
            tracing::error!(job_id = %job_id, "Failed to record job outcome: {}", e);
        }
    }

    async fn generate(&self, notebook_id: Uuid, job_type: JobType) -> Result<String> {
        if !SourceRepository::new(&self.db)
            .exists_in_notebook(notebook_id)
            .await?
        {
            return Err(Error::NoContent(
                "No sources available in this notebook".to_string(),
            ));
        }

        let documents = self
            .retrieval
            .notebook_documents(notebook_id, CONTEXT_CHUNKS)
            .await?;
        if documents.is_empty() {
            return Err(Error::NoContent("Content not yet indexed".to_string()));
        }

        let context = join_context(&documents)
            .ok_or_else(|| Error::NoContent("No content available".to_string()))?;

        generate_payload(self.chat.as_ref(), job_type, &context).await
    }

    pub async fn get(
        &self,
        notebook_id: Uuid,
        user_id: Uuid,
        job_id: Uuid,
    ) -> Result<GenerationJob> {
        JobRepository::new(&self.db)
            .get_for_user(job_id, notebook_id, user_id)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn list(&self, notebook_id: Uuid, user_id: Uuid) -> Result<Vec<GenerationJob>> {
        JobRepository::new(&self.db).list(notebook_id, user_id).await
    }

    /// Newest active job of the type, else the newest completed one
    pub async fn latest(
        &self,
        notebook_id: Uuid,
        user_id: Uuid,
        job_type: JobType,
    ) -> Result<GenerationJob> {
        let repo = JobRepository::new(&self.db);

        if let Some(active) = repo
            .latest_with_status(notebook_id, user_id, job_type, &JobStatus::ACTIVE)
            .await?
        {
            return Ok(active);
        }

        repo.latest_with_status(notebook_id, user_id, job_type, &[JobStatus::Completed])
            .await?
            .ok_or_else(not_found)
    }

    /// Fail jobs a previous process left running
    pub async fn recover_interrupted(&self) -> Result<u64> {
        let failed = JobRepository::new(&self.db).fail_interrupted().await?;
        if failed > 0 {
            tracing::warn!(failed, "Marked interrupted generation jobs as failed");
        }
        Ok(failed)
    }
}

/// Generate the JSON payload of a job from notebook context
pub async fn generate_payload(
    model: &dyn ChatModel,
    job_type: JobType,
    context: &str,
) -> Result<String> {
    match job_type {
        JobType::StudyGuide => {
            structured::<StudyGuide>(model, STUDY_GUIDE_PROMPT, "study guide", context).await
        }
        JobType::Flashcards => {
            structured::<Flashcards>(model, FLASHCARDS_PROMPT, "flashcards", context).await
        }
        JobType::Questionnaire => {
            structured::<Questionnaire>(model, QUESTIONNAIRE_PROMPT, "questionnaire", context)
                .await
        }
        JobType::MindMap => {
            structured::<MindMap>(model, MIND_MAP_PROMPT, "mind map", context).await
        }
    }
}

async fn structured<T: StructuredOutput + Serialize>(
    model: &dyn ChatModel,
    system: &str,
    noun: &str,
    context: &str,
) -> Result<String> {
    let article = if noun == "flashcards" { "" } else { "a " };
    let user = format!("Create {}{} from this content:\n\n{}", article, noun, context);

    let value: T = llm::generate_structured(model, system, &user).await?;
    serde_json::to_string(&value)
        .map_err(|e| Error::Other(format!("Failed to serialize generated {}: {}", noun, e)))
}

fn not_found() -> Error {
    Error::NotFound("Job".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::{LlmResponse, Message};

    struct CannedModel {
        reply: String,
        seen: Mutex<Vec<Message>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
            self.seen.lock().unwrap().extend(messages);
            Ok(LlmResponse::text(self.reply.clone()))
        }
    }

    #[tokio::test]
    async fn test_flashcards_payload() {
        let model = CannedModel::new(
            "```json\n{\"flashcards\": [{\"front\": \"Borrow?\", \"back\": \"A reference\"}]}\n```",
        );

        let payload = generate_payload(&model, JobType::Flashcards, "Rust borrowing")
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["flashcards"][0]["back"], "A reference");

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].content.starts_with("You are an expert educator. Create flashcards"));
        assert_eq!(seen[1].content, "Create flashcards from this content:\n\nRust borrowing");
    }

    #[tokio::test]
    async fn test_mind_map_payload_keeps_nesting() {
        let model = CannedModel::new(
            r#"{"central": "Rust", "branches": [{"label": "Memory", "children": [{"label": "Ownership"}]}]}"#,
        );

        let payload = generate_payload(&model, JobType::MindMap, "ctx").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["branches"][0]["children"][0]["label"], "Ownership");
        assert_eq!(
            model.seen.lock().unwrap()[1].content,
            "Create a mind map from this content:\n\nctx"
        );
    }

    #[tokio::test]
    async fn test_unparseable_reply_fails() {
        let model = CannedModel::new("I cannot help with that.");
        let err = generate_payload(&model, JobType::StudyGuide, "ctx")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LLMError(_)));
    }
}
