//! Notes inside a notebook

use uuid::Uuid;

use crate::domain::{Note, NoteCreate, NoteResponse, NoteUpdate, NoteWithContent};
use crate::error::{Error, Result};
use crate::infrastructure::{NoteRepository, NotebookRepository};
use crate::storage::Database;

#[derive(Debug, Clone)]
pub struct NoteService {
    db: Database,
}

impl NoteService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, notebook_id: Uuid) -> Result<Vec<NoteResponse>> {
        let notes = NoteRepository::new(&self.db).list(notebook_id).await?;
        Ok(notes.iter().map(NoteResponse::from).collect())
    }

    pub async fn get(&self, notebook_id: Uuid, note_id: Uuid) -> Result<NoteWithContent> {
        NoteRepository::new(&self.db)
            .get(notebook_id, note_id)
            .await?
            .map(|note| NoteWithContent::from(&note))
            .ok_or_else(not_found)
    }

    pub async fn create(&self, notebook_id: Uuid, request: NoteCreate) -> Result<NoteResponse> {
        request.validate()?;

        let note = Note::new(notebook_id, request);
        NoteRepository::new(&self.db).create(&note).await?;
        self.touch_notebook(notebook_id).await;

        Ok(NoteResponse::from(&note))
    }

    pub async fn update(&self, notebook_id: Uuid, request: NoteUpdate) -> Result<NoteResponse> {
        let id = request.validate()?;
        let repo = NoteRepository::new(&self.db);

        let mut note = repo.get(notebook_id, id).await?.ok_or_else(not_found)?;
        note.apply(&request);
        repo.update(&note).await?;
        self.touch_notebook(notebook_id).await;

        Ok(NoteResponse::from(&note))
    }

    pub async fn delete(&self, notebook_id: Uuid, note_id: Uuid) -> Result<NoteResponse> {
        let repo = NoteRepository::new(&self.db);

        let note = repo.get(notebook_id, note_id).await?.ok_or_else(not_found)?;
        if !repo.delete(notebook_id, note_id).await? {
            return Err(not_found());
        }

        Ok(NoteResponse::from(&note))
    }

    async fn touch_notebook(&self, notebook_id: Uuid) {
        if let Err(e) = NotebookRepository::new(&self.db).touch(notebook_id).await {
            tracing::warn!(notebook_id = %notebook_id, "Failed to touch notebook: {}", e);
        }
    }
}

fn not_found() -> Error {
    Error::NotFound("Note".to_string())
}
