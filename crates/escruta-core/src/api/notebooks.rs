//! `/notebooks` endpoints

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;
use super::extract::{ApiJson, CurrentUser, NotebookAccess};
use crate::domain::notebook::NotebookDelete;
use crate::domain::{NotebookCreate, NotebookResponse, NotebookUpdate, NotebookWithDetails};
use crate::error::Result;

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<NotebookResponse>>> {
    Ok(Json(state.notebooks.list(&user).await?))
}

pub async fn get(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<NotebookWithDetails>> {
    Ok(Json(
        state
            .notebooks
            .details(&access.user, access.notebook_id)
            .await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NotebookCreate>,
) -> Result<(StatusCode, Json<NotebookResponse>)> {
    let notebook = state.notebooks.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(notebook)))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NotebookUpdate>,
) -> Result<Json<NotebookResponse>> {
    Ok(Json(state.notebooks.update(&user, request).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<NotebookDelete>,
) -> Result<Json<NotebookResponse>> {
    Ok(Json(state.notebooks.delete(&user, request).await?))
}
