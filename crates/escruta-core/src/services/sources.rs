//! Sources: web pages and uploaded files turned into indexed Markdown

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    Source, SourceCreate, SourceFileCreate, SourceResponse, SourceUpdate, SourceWithContent,
};
use crate::error::{Error, Result};
use crate::infrastructure::{NotebookRepository, SourceRepository};
use crate::ingestion::{WebFetcher, extract_text, html_to_markdown};
use crate::llm::{self, ChatModel};
use crate::retrieval::{IndexRequest, Indexer, RetrievalService};
use crate::storage::Database;

const CLEANUP_PROMPT: &str = "\
Clean and improve this Markdown content.

RULES:
- Remove any leftover navigation, menus, or boilerplate text
- Keep all the important information intact
- Fix formatting issues
- Output ONLY the cleaned Markdown, nothing else";

const SUMMARY_PROMPT: &str = "\
You are an expert content summarizer. Your task is to create a concise summary of the provided content.
The summary should be 2-3 sentences that capture the essential information and main points.
Focus on the key concepts, findings, or conclusions presented in the content.";

/// A file received through a multipart upload
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct SourceService {
    db: Database,
    chat: Arc<dyn ChatModel>,
    fetcher: WebFetcher,
    indexer: Indexer,
    retrieval: RetrievalService,
}

impl SourceService {
    pub fn new(
        db: Database,
        chat: Arc<dyn ChatModel>,
        fetcher: WebFetcher,
        indexer: Indexer,
        retrieval: RetrievalService,
    ) -> Self {
        Self {
            db,
            chat,
            fetcher,
            indexer,
            retrieval,
        }
    }

    pub async fn list(&self, notebook_id: Uuid) -> Result<Vec<SourceResponse>> {
        let sources = SourceRepository::new(&self.db).list(notebook_id).await?;
        Ok(sources.iter().map(SourceResponse::from).collect())
    }

    pub async fn get(&self, notebook_id: Uuid, source_id: Uuid) -> Result<SourceWithContent> {
        Ok(SourceWithContent::from(&self.load(notebook_id, source_id).await?))
    }

    /// Fetch a web page, store its main content as Markdown and index it
    pub async fn add_web(
        &self,
        notebook_id: Uuid,
        request: SourceCreate,
        ai_converter: bool,
    ) -> Result<SourceWithContent> {
        request.validate()?;
        let link = request.link.unwrap_or_default();

        let page = self.fetcher.fetch(&link).await?;
        let mut content = html_to_markdown(&page.html);
        if content.trim().is_empty() {
            content = page.text;
        }
        if content.trim().is_empty() {
            return Err(Error::NoContent(format!(
                "No content could be extracted from the URL: {}",
                link
            )));
        }

        if ai_converter {
            content = clean_with_model(self.chat.as_ref(), content).await;
        }

        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or(page.title);

        let source = Source::new(notebook_id, title, content)
            .with_icon(request.icon)
            .with_link(link)
            .converted_by_ai(ai_converter);

        self.save_and_index(source).await
    }

    /// Extract the text of an uploaded file, store it and index it
    pub async fn add_file(
        &self,
        notebook_id: Uuid,
        request: SourceFileCreate,
        file: UploadedFile,
        ai_converter: bool,
    ) -> Result<SourceWithContent> {
        request.validate()?;

        let UploadedFile {
            file_name,
            content_type,
            bytes,
        } = file;
        tracing::debug!(
            notebook_id = %notebook_id,
            file_name = file_name.as_deref().unwrap_or(""),
            size = bytes.len(),
            "Extracting uploaded file"
        );

        // PDF parsing is CPU bound
        let mut content = tokio::task::spawn_blocking(move || {
            extract_text(content_type.as_deref(), file_name.as_deref(), &bytes)
        })
        .await
        .map_err(|e| Error::Other(format!("File extraction task failed: {}", e)))??;

        if ai_converter {
            content = clean_with_model(self.chat.as_ref(), content).await;
        }

        let title = request.title.unwrap_or_default();
        let source = Source::new(notebook_id, title.trim(), content)
            .with_icon(request.icon)
            .converted_by_ai(ai_converter);

        self.save_and_index(source).await
    }

    pub async fn update(&self, notebook_id: Uuid, request: SourceUpdate) -> Result<SourceResponse> {
        let id = request.validate()?;
        let repo = SourceRepository::new(&self.db);

        let mut source = repo.get(notebook_id, id).await?.ok_or_else(not_found)?;
        source.apply(&request);
        repo.update(&source).await?;

        Ok(SourceResponse::from(&source))
    }

    /// Remove the indexed chunks of a source, then the source itself
    pub async fn delete(&self, notebook_id: Uuid, source_id: Uuid) -> Result<SourceResponse> {
        let source = self.load(notebook_id, source_id).await?;

        self.retrieval.remove_source(source_id).await;
        if !SourceRepository::new(&self.db)
            .delete(notebook_id, source_id)
            .await?
        {
            return Err(not_found());
        }

        tracing::info!(notebook_id = %notebook_id, source_id = %source_id, "Deleted source");
        Ok(SourceResponse::from(&source))
    }

    /// Summarize a source with the model and persist the result
    ///
    /// A failed generation keeps the previous summary; `NotFound` is returned
    /// when there is none.
    pub async fn generate_summary(&self, notebook_id: Uuid, source_id: Uuid) -> Result<String> {
        let source = self.load(notebook_id, source_id).await?;

        match llm::generate_text(self.chat.as_ref(), SUMMARY_PROMPT, &source.content).await {
            Ok(summary) => {
                SourceRepository::new(&self.db)
                    .set_summary(source_id, Some(&summary))
                    .await?;
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(source_id = %source_id, "Source summary generation failed: {}", e);
                source
                    .summary
                    .ok_or_else(|| Error::NotFound("Summary".to_string()))
            }
        }
    }

    /// Stored summary, or an empty string when the source or summary is missing
    pub async fn get_summary(&self, notebook_id: Uuid, source_id: Uuid) -> Result<String> {
        let source = SourceRepository::new(&self.db)
            .get(notebook_id, source_id)
            .await?;
        Ok(source.and_then(|s| s.summary).unwrap_or_default())
    }

    pub async fn delete_summary(&self, notebook_id: Uuid, source_id: Uuid) -> Result<()> {
        self.load(notebook_id, source_id).await?;
        SourceRepository::new(&self.db)
            .set_summary(source_id, None)
            .await
    }

    async fn load(&self, notebook_id: Uuid, source_id: Uuid) -> Result<Source> {
        SourceRepository::new(&self.db)
            .get(notebook_id, source_id)
            .await?
            .ok_or_else(not_found)
    }

    async fn save_and_index(&self, source: Source) -> Result<SourceWithContent> {
        SourceRepository::new(&self.db).create(&source).await?;
        if let Err(e) = NotebookRepository::new(&self.db).touch(source.notebook_id).await {
            tracing::warn!(notebook_id = %source.notebook_id, "Failed to touch notebook: {}", e);
        }

        tracing::info!(
            notebook_id = %source.notebook_id,
            source_id = %source.id,
            chars = source.content.len(),
            "Added source, indexing in background"
        );

        self.indexer.spawn(IndexRequest {
            notebook_id: source.notebook_id,
            source_id: source.id,
            title: Some(source.title.clone()),
            link: source.link.clone(),
            content: source.content.clone(),
        });

        Ok(SourceWithContent::from(&source))
    }
}

/// Ask the model to tidy extracted Markdown, keeping the input on failure
pub async fn clean_with_model(model: &dyn ChatModel, content: String) -> String {
    match llm::generate_text(model, CLEANUP_PROMPT, &content).await {
        Ok(cleaned) if !cleaned.trim().is_empty() => cleaned,
        Ok(_) => content,
        Err(e) => {
            tracing::warn!("AI clean-up failed, keeping extracted content: {}", e);
            content
        }
    }
}

fn not_found() -> Error {
    Error::NotFound("Source".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::llm::{LlmResponse, Message};

    struct ScriptedModel {
        reply: Option<String>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
            assert_eq!(messages.len(), 2);
            assert!(messages[0].content.starts_with("Clean and improve"));
            match &self.reply {
                Some(reply) => Ok(LlmResponse::text(reply.clone())),
                None => Err(Error::LLMError("provider down".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_cleanup_uses_model_output() {
        let model = ScriptedModel {
            reply: Some("# Clean".into()),
        };
        assert_eq!(clean_with_model(&model, "# Dirty\nMenu".into()).await, "# Clean");
    }

    #[tokio::test]
    async fn test_cleanup_falls_back_on_error() {
        let model = ScriptedModel { reply: None };
        assert_eq!(clean_with_model(&model, "original".into()).await, "original");
    }

    #[tokio::test]
    async fn test_cleanup_ignores_blank_output() {
        let model = ScriptedModel {
            reply: Some("  ".into()),
        };
        assert_eq!(clean_with_model(&model, "original".into()).await, "original");
    }
}
