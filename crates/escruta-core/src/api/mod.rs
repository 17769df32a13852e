//! HTTP API
//!
//! Handlers are thin: they extract and authorize the request, call a service
//! and map its result. Errors render as problem documents (see [`problem`]).

pub mod auth;
pub mod chat;
pub mod extract;
pub mod health;
pub mod notebooks;
pub mod notes;
pub mod problem;
pub mod sources;
pub mod tools;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, Uri};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, CorsConfig};
use crate::error::Result;
use crate::ingestion::{TokenTextSplitter, TokenTextSplitterConfig, WebFetcher};
use crate::llm::{ChatModel, EmbeddingModel};
use crate::retrieval::{Indexer, RetrievalService, VectorStore};
use crate::services::{
    AuthService, ChatService, NoteService, NotebookService, SourceService, TokenService,
    ToolsService, UserService,
};
use crate::storage::Database;

pub use problem::ProblemDetail;

/// Largest accepted file upload
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
    pub users: UserService,
    pub notebooks: NotebookService,
    pub notes: NoteService,
    pub sources: SourceService,
    pub chat: ChatService,
    pub tools: ToolsService,
}

impl AppState {
    pub fn new(
        config: &Config,
        db: Database,
        chat_model: Arc<dyn ChatModel>,
        embeddings: Arc<dyn EmbeddingModel>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let splitter =
            TokenTextSplitter::with_config(TokenTextSplitterConfig::from(&config.retrieval))?;
        let retrieval = RetrievalService::new(store, embeddings, splitter);
        let indexer = Indexer::new(retrieval.clone());
        let tokens = TokenService::new(db.clone(), config.security.token_ttl_secs);

        Ok(Self {
            auth: AuthService::new(db.clone(), tokens),
            users: UserService::new(db.clone()),
            notebooks: NotebookService::new(db.clone(), retrieval.clone()),
            notes: NoteService::new(db.clone()),
            sources: SourceService::new(
                db.clone(),
                chat_model.clone(),
                WebFetcher::new()?,
                indexer,
                retrieval.clone(),
            ),
            chat: ChatService::new(
                db.clone(),
                chat_model.clone(),
                retrieval.clone(),
                config.retrieval.clone(),
            ),
            tools: ToolsService::new(db.clone(), chat_model, retrieval),
            db,
        })
    }
}

/// Build the application router
pub fn router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/introspect", post(auth::introspect))
        .route("/logout", post(auth::logout))
        .route("/users/me", get(users::me))
        .route("/users/change-name", post(users::change_name))
        .route("/users/change-password", post(users::change_password))
        .route(
            "/notebooks",
            get(notebooks::list)
                .post(notebooks::create)
                .put(notebooks::update)
                .delete(notebooks::delete),
        )
        .route("/notebooks/{notebookId}", get(notebooks::get))
        .route(
            "/notebooks/{notebookId}/notes",
            get(notes::list).post(notes::create).put(notes::update),
        )
        .route(
            "/notebooks/{notebookId}/notes/{noteId}",
            get(notes::get).delete(notes::delete),
        )
        .route(
            "/notebooks/{notebookId}/sources",
            get(sources::list)
                .post(sources::create)
                .put(sources::update),
        )
        .route(
            "/notebooks/{notebookId}/sources/file",
            post(sources::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/notebooks/{notebookId}/sources/{sourceId}",
            get(sources::get).delete(sources::delete),
        )
        .route(
            "/notebooks/{notebookId}/sources/{sourceId}/summary",
            get(sources::get_summary)
                .post(sources::generate_summary)
                .delete(sources::delete_summary),
        )
        .route("/notebooks/{notebookId}/chat", post(chat::chat))
        .route(
            "/notebooks/{notebookId}/chat/{conversationId}",
            get(chat::history).delete(chat::clear_history),
        )
        .route(
            "/notebooks/{notebookId}/summary",
            get(chat::get_summary).post(chat::generate_summary),
        )
        .route(
            "/notebooks/{notebookId}/example-questions",
            get(chat::example_questions),
        )
        .route("/notebooks/{notebookId}/tools/generate", post(tools::generate))
        .route("/notebooks/{notebookId}/tools/jobs", get(tools::jobs))
        .route("/notebooks/{notebookId}/tools/jobs/{jobId}", get(tools::job))
        .route(
            "/notebooks/{notebookId}/tools/jobs/latest/{type}",
            get(tools::latest),
        )
        .fallback(fallback)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback(uri: Uri) -> ProblemDetail {
    ProblemDetail::not_found(uri.path())
}

/// CORS policy from configuration; unparseable entries are skipped
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|method| Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).ok())
        .collect();

    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|header| HeaderName::from_bytes(header.trim().as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials)
}
