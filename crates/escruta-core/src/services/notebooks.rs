//! Notebooks and their ownership

use uuid::Uuid;

use crate::domain::notebook::NotebookDelete;
use crate::domain::{
    BasicUser, NoteResponse, Notebook, NotebookCreate, NotebookResponse, NotebookUpdate,
    NotebookWithDetails, SourceResponse, User,
};
use crate::error::{Error, Result};
use crate::infrastructure::{NoteRepository, NotebookRepository, SourceRepository};
use crate::retrieval::RetrievalService;
use crate::storage::Database;

pub const NOT_AUTHORIZED: &str = "You are not authorized to access this resource";

#[derive(Clone)]
pub struct NotebookService {
    db: Database,
    retrieval: RetrievalService,
}

impl NotebookService {
    pub fn new(db: Database, retrieval: RetrievalService) -> Self {
        Self { db, retrieval }
    }

    /// Fail with `Unauthorized` unless the user owns the notebook
    ///
    /// Unknown notebooks are reported the same way as foreign ones.
    pub async fn ensure_owner(&self, notebook_id: Uuid, user_id: Uuid) -> Result<()> {
        if NotebookRepository::new(&self.db)
            .is_owned_by(notebook_id, user_id)
            .await?
        {
            Ok(())
        } else {
            tracing::debug!(
                notebook_id = %notebook_id,
                user_id = %user_id,
                "Notebook access denied"
            );
            Err(Error::Unauthorized(NOT_AUTHORIZED.to_string()))
        }
    }

    pub async fn list(&self, user: &User) -> Result<Vec<NotebookResponse>> {
        let notebooks = NotebookRepository::new(&self.db)
            .list_by_user(user.id)
            .await?;

        let owner = BasicUser::from(user);
        Ok(notebooks
            .iter()
            .map(|notebook| NotebookResponse::new(notebook, owner.clone()))
            .collect())
    }

    pub async fn details(&self, user: &User, notebook_id: Uuid) -> Result<NotebookWithDetails> {
        let notebook = NotebookRepository::new(&self.db)
            .get(notebook_id)
            .await?
            .ok_or_else(|| Error::NotFound("Notebook".to_string()))?;

        let notes = NoteRepository::new(&self.db).list(notebook_id).await?;
        let sources = SourceRepository::new(&self.db).list(notebook_id).await?;

        Ok(NotebookWithDetails {
            notebook: NotebookResponse::new(&notebook, BasicUser::from(user)),
            notes: notes.iter().map(NoteResponse::from).collect(),
            sources: sources.iter().map(SourceResponse::from).collect(),
        })
    }

    pub async fn create(&self, user: &User, request: NotebookCreate) -> Result<NotebookResponse> {
        request.validate()?;

        let title = request.title.unwrap_or_default();
        let notebook = Notebook::new(user.id, title.trim()).with_icon(request.icon);
        NotebookRepository::new(&self.db).create(&notebook).await?;

        tracing::debug!(notebook_id = %notebook.id, user_id = %user.id, "Created notebook");
        Ok(NotebookResponse::new(&notebook, BasicUser::from(user)))
    }

    pub async fn update(&self, user: &User, request: NotebookUpdate) -> Result<NotebookResponse> {
        let id = request.validate()?;
        let mut notebook = self.owned(user, id).await?;

        notebook.apply(&request);
        NotebookRepository::new(&self.db).update(&notebook).await?;

        Ok(NotebookResponse::new(&notebook, BasicUser::from(user)))
    }

    /// Delete a notebook with its notes, sources, jobs and indexed chunks
    pub async fn delete(&self, user: &User, request: NotebookDelete) -> Result<NotebookResponse> {
        let id = request.validate()?;
        let notebook = self.owned(user, id).await?;

        match self.retrieval.remove_notebook(id).await {
            Ok(removed) => tracing::debug!(notebook_id = %id, removed, "Removed indexed chunks"),
            Err(e) => tracing::warn!(notebook_id = %id, "Failed to remove indexed chunks: {}", e),
        }

        if !NotebookRepository::new(&self.db).delete(id).await? {
            return Err(Error::NotFound("Notebook".to_string()));
        }

        tracing::info!(notebook_id = %id, user_id = %user.id, "Deleted notebook");
        Ok(NotebookResponse::new(&notebook, BasicUser::from(user)))
    }

    /// Load a notebook by id: 404 when missing, 401 when someone else's
    async fn owned(&self, user: &User, id: Uuid) -> Result<Notebook> {
        let notebook = NotebookRepository::new(&self.db)
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound("Notebook".to_string()))?;

        if notebook.user_id != user.id {
            return Err(Error::Unauthorized(NOT_AUTHORIZED.to_string()));
        }
        Ok(notebook)
    }
}
