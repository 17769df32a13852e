//! Notebook, note and source repositories
//!
//! Notes and sources are always addressed through their notebook so a
//! caller holding a notebook id can never reach another notebook's rows.

use chrono::Utc;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::Result;
use crate::domain::{Note, Notebook, Source};
use crate::storage::Database;

const NOTEBOOK_COLUMNS: &str = "id, user_id, icon, title, summary, created_at, updated_at";
const NOTE_COLUMNS: &str = "id, notebook_id, icon, title, content, created_at, updated_at";
const SOURCE_COLUMNS: &str = "id, notebook_id, icon, title, link, content, summary, \
                              is_converted_by_ai, created_at, updated_at";

/// Notebook repository for database operations
pub struct NotebookRepository<'a> {
    db: &'a Database,
}

impl<'a> NotebookRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, notebook: &Notebook) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notebooks (id, user_id, icon, title, summary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notebook.id)
        .bind(notebook.user_id)
        .bind(&notebook.icon)
        .bind(&notebook.title)
        .bind(&notebook.summary)
        .bind(notebook.created_at)
        .bind(notebook.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Notebook>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTEBOOK_COLUMNS} FROM notebooks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| self.row_to_notebook(r)))
    }

    /// List a user's notebooks, most recently updated first
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Notebook>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTEBOOK_COLUMNS} FROM notebooks WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|r| self.row_to_notebook(r)).collect())
    }

    /// Whether the notebook exists and belongs to the user
    pub async fn is_owned_by(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM notebooks WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.is_some())
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM notebooks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.is_some())
    }

    pub async fn update(&self, notebook: &Notebook) -> Result<()> {
        sqlx::query("UPDATE notebooks SET icon = $1, title = $2, updated_at = $3 WHERE id = $4")
            .bind(&notebook.icon)
            .bind(&notebook.title)
            .bind(notebook.updated_at)
            .bind(notebook.id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Bump `updated_at` after a child note or source changes
    pub async fn touch(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notebooks SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Store or clear the generated summary
    pub async fn set_summary(&self, id: Uuid, summary: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE notebooks SET summary = $1 WHERE id = $2")
            .bind(summary)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    /// Delete a notebook; notes, sources, jobs and memory cascade
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notebooks WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_notebook(&self, row: PgRow) -> Notebook {
        Notebook {
            id: row.get("id"),
            user_id: row.get("user_id"),
            icon: row.get("icon"),
            title: row.get("title"),
            summary: row.get("summary"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Note repository scoped by notebook
pub struct NoteRepository<'a> {
    db: &'a Database,
}

impl<'a> NoteRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, note: &Note) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notes (id, notebook_id, icon, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(note.id)
        .bind(note.notebook_id)
        .bind(&note.icon)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn get(&self, notebook_id: Uuid, id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND notebook_id = $2"
        ))
        .bind(id)
        .bind(notebook_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| self.row_to_note(r)))
    }

    pub async fn list(&self, notebook_id: Uuid) -> Result<Vec<Note>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE notebook_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(notebook_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|r| self.row_to_note(r)).collect())
    }

    pub async fn update(&self, note: &Note) -> Result<()> {
        sqlx::query(
            "UPDATE notes SET icon = $1, title = $2, content = $3, updated_at = $4 \
             WHERE id = $5 AND notebook_id = $6",
        )
        .bind(&note.icon)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.updated_at)
        .bind(note.id)
        .bind(note.notebook_id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn delete(&self, notebook_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND notebook_id = $2")
            .bind(id)
            .bind(notebook_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_note(&self, row: PgRow) -> Note {
        Note {
            id: row.get("id"),
            notebook_id: row.get("notebook_id"),
            icon: row.get("icon"),
            title: row.get("title"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Source repository scoped by notebook
pub struct SourceRepository<'a> {
    db: &'a Database,
}

impl<'a> SourceRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, source: &Source) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sources (id, notebook_id, icon, title, link, content, summary,
                                 is_converted_by_ai, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(source.id)
        .bind(source.notebook_id)
        .bind(&source.icon)
        .bind(&source.title)
        .bind(&source.link)
        .bind(&source.content)
        .bind(&source.summary)
        .bind(source.is_converted_by_ai)
        .bind(source.created_at)
        .bind(source.updated_at)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn get(&self, notebook_id: Uuid, id: Uuid) -> Result<Option<Source>> {
        let row = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE id = $1 AND notebook_id = $2"
        ))
        .bind(id)
        .bind(notebook_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| self.row_to_source(r)))
    }

    /// Sources of a notebook, oldest first
    pub async fn list(&self, notebook_id: Uuid) -> Result<Vec<Source>> {
        let rows = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE notebook_id = $1 ORDER BY created_at ASC"
        ))
        .bind(notebook_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(|r| self.row_to_source(r)).collect())
    }

    pub async fn exists_in_notebook(&self, notebook_id: Uuid) -> Result<bool> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sources WHERE notebook_id = $1 LIMIT 1")
                .bind(notebook_id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.is_some())
    }

    pub async fn update(&self, source: &Source) -> Result<()> {
        sqlx::query(
            "UPDATE sources SET icon = $1, title = $2, updated_at = $3 \
             WHERE id = $4 AND notebook_id = $5",
        )
        .bind(&source.icon)
        .bind(&source.title)
        .bind(source.updated_at)
        .bind(source.id)
        .bind(source.notebook_id)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    pub async fn set_summary(&self, id: Uuid, summary: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE sources SET summary = $1 WHERE id = $2")
            .bind(summary)
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(())
    }

    pub async fn delete(&self, notebook_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sources WHERE id = $1 AND notebook_id = $2")
            .bind(id)
            .bind(notebook_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_source(&self, row: PgRow) -> Source {
        Source {
            id: row.get("id"),
            notebook_id: row.get("notebook_id"),
            icon: row.get("icon"),
            title: row.get("title"),
            link: row.get("link"),
            content: row.get("content"),
            summary: row.get("summary"),
            is_converted_by_ai: row.get("is_converted_by_ai"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}
