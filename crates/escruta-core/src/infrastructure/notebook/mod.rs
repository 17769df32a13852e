//! Notebooks and the notes and sources they contain

pub mod repository;

pub use repository::{NoteRepository, NotebookRepository, SourceRepository};
