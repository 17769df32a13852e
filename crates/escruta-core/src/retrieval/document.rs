//! Stored chunk types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata stored next to each chunk
///
/// Every value is serialized as a JSON string so the store can filter with
/// `metadata->>'key'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub source_id: Uuid,
    pub notebook_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(with = "string_index")]
    pub chunk_index: usize,
}

mod string_index {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &usize, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// A chunk as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    pub id: Uuid,
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl VectorDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            metadata,
        }
    }
}

/// A chunk paired with its embedding, ready to store
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub document: VectorDocument,
    pub embedding: Vec<f32>,
}

/// A search hit; `score` is cosine similarity, higher is closer
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: VectorDocument,
    pub score: f32,
}
