//! Domain entities and the request/response shapes built from them

pub mod chat;
pub mod job;
pub mod note;
pub mod notebook;
pub mod source;
pub mod tools;
pub mod user;
pub mod validation;

pub use chat::{ChatMemoryMessage, ChatReply, ChatRequest, CitedSource, MemoryMessageType};
pub use job::{GenerationJob, GenerationJobResponse, JobStatus, JobType};
pub use note::{Note, NoteCreate, NoteResponse, NoteUpdate, NoteWithContent};
pub use notebook::{Notebook, NotebookCreate, NotebookResponse, NotebookUpdate, NotebookWithDetails};
pub use source::{
    Source, SourceCreate, SourceFileCreate, SourceResponse, SourceUpdate, SourceWithContent,
};
pub use user::{AccessToken, BasicUser, User};
