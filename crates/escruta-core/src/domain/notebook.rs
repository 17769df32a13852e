//! Notebooks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::note::NoteResponse;
use super::source::SourceResponse;
use super::user::BasicUser;
use super::validation::{Validator, parse_id};
use crate::error::Result;

/// A user-owned container of notes and sources
#[derive(Debug, Clone)]
pub struct Notebook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub icon: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notebook {
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            icon: None,
            title: title.into(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    /// Apply the fields present in an update request
    pub fn apply(&mut self, update: &NotebookUpdate) {
        if let Some(icon) = &update.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookCreate {
    pub icon: Option<String>,
    pub title: Option<String>,
}

impl NotebookCreate {
    pub fn validate(&self) -> Result<()> {
        Validator::new().not_blank("title", self.title.as_deref()).finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookUpdate {
    pub id: Option<String>,
    pub icon: Option<String>,
    pub title: Option<String>,
}

impl NotebookUpdate {
    /// Validate and return the target notebook id
    pub fn validate(&self) -> Result<Uuid> {
        Validator::new().uuid("id", self.id.as_deref()).finish()?;
        parse_id("id", self.id.as_deref().unwrap_or_default())
    }
}

/// Body of `DELETE /notebooks`
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookDelete {
    pub id: Option<String>,
}

impl NotebookDelete {
    pub fn validate(&self) -> Result<Uuid> {
        Validator::new().uuid("id", self.id.as_deref()).finish()?;
        parse_id("id", self.id.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookResponse {
    pub id: Uuid,
    pub user: BasicUser,
    pub icon: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotebookResponse {
    pub fn new(notebook: &Notebook, user: BasicUser) -> Self {
        Self {
            id: notebook.id,
            user,
            icon: notebook.icon.clone(),
            title: notebook.title.clone(),
            created_at: notebook.created_at,
            updated_at: notebook.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookWithDetails {
    #[serde(flatten)]
    pub notebook: NotebookResponse,
    pub notes: Vec<NoteResponse>,
    pub sources: Vec<SourceResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_keeps_missing_fields() {
        let mut notebook = Notebook::new(Uuid::new_v4(), "Physics").with_icon(Some("atom".into()));
        notebook.apply(&NotebookUpdate {
            id: Some(notebook.id.to_string()),
            icon: None,
            title: Some("Quantum Physics".into()),
        });

        assert_eq!(notebook.title, "Quantum Physics");
        assert_eq!(notebook.icon.as_deref(), Some("atom"));
    }

    #[test]
    fn test_update_requires_valid_id() {
        let update = NotebookUpdate {
            id: Some("nope".into()),
            icon: None,
            title: None,
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_details_flatten_notebook_fields() {
        let notebook = Notebook::new(Uuid::new_v4(), "History");
        let user = BasicUser {
            id: notebook.user_id,
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
        };
        let details = NotebookWithDetails {
            notebook: NotebookResponse::new(&notebook, user),
            notes: vec![],
            sources: vec![],
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["title"], "History");
        assert_eq!(json["user"]["fullName"], "Ada");
        assert!(json["notes"].as_array().unwrap().is_empty());
        assert!(json.get("createdAt").is_some());
    }
}
