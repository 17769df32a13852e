//! Notes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{Validator, parse_id};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Note {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub icon: Option<String>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(notebook_id: Uuid, create: NoteCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            notebook_id,
            icon: create.icon,
            title: create.title.unwrap_or_default(),
            content: create.content.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: &NoteUpdate) {
        if let Some(icon) = &update.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCreate {
    pub icon: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteCreate {
    pub fn validate(&self) -> Result<()> {
        Validator::new().not_blank("title", self.title.as_deref()).finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub id: Option<String>,
    pub icon: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteUpdate {
    pub fn validate(&self) -> Result<Uuid> {
        Validator::new().uuid("id", self.id.as_deref()).finish()?;
        parse_id("id", self.id.as_deref().unwrap_or_default())
    }
}

/// Note listing entry without content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub icon: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for NoteResponse {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            icon: note.icon.clone(),
            title: note.title.clone(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteWithContent {
    #[serde(flatten)]
    pub note: NoteResponse,
    pub content: String,
}

impl From<&Note> for NoteWithContent {
    fn from(note: &Note) -> Self {
        Self {
            note: NoteResponse::from(note),
            content: note.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_update_is_partial() {
        let mut note = Note::new(
            Uuid::new_v4(),
            NoteCreate {
                icon: None,
                title: Some("Draft".into()),
                content: Some("first".into()),
            },
        );
        note.apply(&NoteUpdate {
            id: Some(note.id.to_string()),
            icon: Some("pencil".into()),
            title: None,
            content: None,
        });

        assert_eq!(note.title, "Draft");
        assert_eq!(note.content, "first");
        assert_eq!(note.icon.as_deref(), Some("pencil"));
    }

    #[test]
    fn test_blank_title_rejected() {
        let create = NoteCreate {
            icon: None,
            title: Some(" ".into()),
            content: None,
        };
        assert!(create.validate().is_err());
    }
}
