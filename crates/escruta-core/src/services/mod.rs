//! Application services
//!
//! Each service orchestrates repositories, retrieval and the model seams for
//! one area of the API. Services are cheap to clone and safe to move into
//! background tasks.

pub mod auth;
pub mod chat;
pub mod notebooks;
pub mod notes;
pub mod sources;
pub mod tools;
pub mod users;

pub use auth::{AuthService, IssuedToken, TokenService};
pub use chat::ChatService;
pub use notebooks::NotebookService;
pub use notes::NoteService;
pub use sources::{SourceService, UploadedFile};
pub use tools::ToolsService;
pub use users::UserService;
