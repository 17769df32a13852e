//! `/notebooks/{notebookId}/notes` endpoints

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;
use super::extract::{ApiJson, NotebookAccess};
use crate::domain::{NoteCreate, NoteResponse, NoteUpdate, NoteWithContent};
use crate::error::Result;

pub async fn list(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<Vec<NoteResponse>>> {
    Ok(Json(state.notes.list(access.notebook_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<NoteWithContent>> {
    let note_id = access.path_id("noteId")?;
    Ok(Json(state.notes.get(access.notebook_id, note_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiJson(request): ApiJson<NoteCreate>,
) -> Result<(StatusCode, Json<NoteResponse>)> {
    let note = state.notes.create(access.notebook_id, request).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiJson(request): ApiJson<NoteUpdate>,
) -> Result<Json<NoteResponse>> {
    Ok(Json(state.notes.update(access.notebook_id, request).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<NoteResponse>> {
    let note_id = access.path_id("noteId")?;
    Ok(Json(state.notes.delete(access.notebook_id, note_id).await?))
}
