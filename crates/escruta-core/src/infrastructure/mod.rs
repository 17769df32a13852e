//! Infrastructure layer
//!
//! PostgreSQL repositories for every persisted entity.

pub mod chat;
pub mod identity;
pub mod job;
pub mod notebook;

pub use chat::{ChatMemoryRepository, ChatMemoryStore, InMemoryChatMemory, PgChatMemory};
pub use identity::{AccessTokenRepository, UserRepository};
pub use job::JobRepository;
pub use notebook::{NoteRepository, NotebookRepository, SourceRepository};

use crate::Result;

/// Parse an enum stored as text, failing on values no variant matches
pub(crate) fn decode_enum<T>(
    column: &str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T> {
    parse(value).ok_or_else(|| {
        sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("unrecognized value '{}'", value).into(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::domain::{JobType, MemoryMessageType};

    #[test]
    fn test_decode_enum_known_value() {
        let job_type = decode_enum("type", "MIND_MAP", JobType::parse).unwrap();
        assert_eq!(job_type, JobType::MindMap);
    }

    #[test]
    fn test_decode_enum_rejects_corrupt_value() {
        let err = decode_enum("type", "SYSTEM", MemoryMessageType::parse).unwrap_err();
        assert!(matches!(err, Error::DatabaseError(sqlx::Error::ColumnDecode { .. })));
        assert_eq!(err.code(), "E500");
        assert!(err.to_string().contains("SYSTEM"));
    }
}
