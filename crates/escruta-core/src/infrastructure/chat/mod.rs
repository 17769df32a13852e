//! Persisted conversation memory

pub mod memory;
pub mod repository;

pub use memory::{ChatMemoryStore, InMemoryChatMemory, PgChatMemory};
pub use repository::ChatMemoryRepository;
