//! Sources: ingested web pages and uploaded documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{Validator, parse_id};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Source {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub icon: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    pub is_converted_by_ai: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(notebook_id: Uuid, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            notebook_id,
            icon: None,
            title: title.into(),
            link: None,
            content: content.into(),
            summary: None,
            is_converted_by_ai: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn converted_by_ai(mut self, converted: bool) -> Self {
        self.is_converted_by_ai = converted;
        self
    }

    pub fn apply(&mut self, update: &SourceUpdate) {
        if let Some(icon) = &update.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Body of `POST /notebooks/{id}/sources`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCreate {
    pub icon: Option<String>,
    /// Falls back to the page title when absent
    pub title: Option<String>,
    pub link: Option<String>,
}

impl SourceCreate {
    pub fn validate(&self) -> Result<()> {
        Validator::new().url("link", self.link.as_deref()).finish()
    }
}

/// Form fields accompanying an uploaded file
#[derive(Debug, Clone, Default)]
pub struct SourceFileCreate {
    pub icon: Option<String>,
    pub title: Option<String>,
}

impl SourceFileCreate {
    pub fn validate(&self) -> Result<()> {
        Validator::new().not_blank("title", self.title.as_deref()).finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUpdate {
    pub id: Option<String>,
    pub icon: Option<String>,
    pub title: Option<String>,
}

impl SourceUpdate {
    pub fn validate(&self) -> Result<Uuid> {
        Validator::new().uuid("id", self.id.as_deref()).finish()?;
        parse_id("id", self.id.as_deref().unwrap_or_default())
    }
}

/// Source listing entry without content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub id: Uuid,
    pub icon: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub is_converted_by_ai: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Source> for SourceResponse {
    fn from(source: &Source) -> Self {
        Self {
            id: source.id,
            icon: source.icon.clone(),
            title: source.title.clone(),
            link: source.link.clone(),
            is_converted_by_ai: source.is_converted_by_ai,
            created_at: source.created_at,
            updated_at: source.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceWithContent {
    #[serde(flatten)]
    pub source: SourceResponse,
    pub content: String,
    pub summary: Option<String>,
}

impl From<&Source> for SourceWithContent {
    fn from(source: &Source) -> Self {
        Self {
            source: SourceResponse::from(source),
            content: source.content.clone(),
            summary: source.summary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_response_shape() {
        let source = Source::new(Uuid::new_v4(), "Rust", "# Rust")
            .with_link("https://www.rust-lang.org")
            .converted_by_ai(true);

        let json = serde_json::to_value(SourceWithContent::from(&source)).unwrap();
        assert_eq!(json["isConvertedByAi"], true);
        assert_eq!(json["link"], "https://www.rust-lang.org");
        assert_eq!(json["content"], "# Rust");
    }

    #[test]
    fn test_link_must_be_http() {
        let create = SourceCreate {
            icon: None,
            title: None,
            link: Some("javascript:alert(1)".into()),
        };
        assert!(create.validate().is_err());

        let file = SourceFileCreate::default();
        assert!(file.validate().is_err());
    }
}
