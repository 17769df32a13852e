//! `/notebooks/{notebookId}/sources` endpoints

use axum::Json;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::AppState;
use super::extract::{ApiJson, ApiQuery, NotebookAccess};
use crate::domain::{
    SourceCreate, SourceFileCreate, SourceResponse, SourceUpdate, SourceWithContent,
};
use crate::error::{Error, Result};
use crate::services::UploadedFile;

#[derive(Debug, Default, Deserialize)]
pub struct ConverterQuery {
    #[serde(rename = "aiConverter", default)]
    pub ai_converter: bool,
}

pub async fn list(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<Vec<SourceResponse>>> {
    Ok(Json(state.sources.list(access.notebook_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<SourceWithContent>> {
    let source_id = access.path_id("sourceId")?;
    Ok(Json(state.sources.get(access.notebook_id, source_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiQuery(query): ApiQuery<ConverterQuery>,
    ApiJson(request): ApiJson<SourceCreate>,
) -> Result<(StatusCode, Json<SourceWithContent>)> {
    let source = state
        .sources
        .add_web(access.notebook_id, request, query.ai_converter)
        .await?;
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn upload(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiQuery(query): ApiQuery<ConverterQuery>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SourceWithContent>)> {
    let mut multipart = multipart.map_err(|e| Error::InvalidInput(e.body_text()))?;

    let mut form = SourceFileCreate::default();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => form.title = Some(field.text().await.map_err(multipart_error)?),
            "icon" => form.icon = Some(field.text().await.map_err(multipart_error)?),
            _ => tracing::debug!(field = %name, "Ignoring unknown multipart field"),
        }
    }

    let file = file.ok_or_else(|| Error::invalid_field("file", "must not be null"))?;
    let source = state
        .sources
        .add_file(access.notebook_id, form, file, query.ai_converter)
        .await?;
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn update(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiJson(request): ApiJson<SourceUpdate>,
) -> Result<Json<SourceResponse>> {
    Ok(Json(state.sources.update(access.notebook_id, request).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<SourceResponse>> {
    let source_id = access.path_id("sourceId")?;
    Ok(Json(state.sources.delete(access.notebook_id, source_id).await?))
}

pub async fn get_summary(State(state): State<AppState>, access: NotebookAccess) -> Result<String> {
    let source_id = access.path_id("sourceId")?;
    state.sources.get_summary(access.notebook_id, source_id).await
}

pub async fn generate_summary(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<String> {
    let source_id = access.path_id("sourceId")?;
    state
        .sources
        .generate_summary(access.notebook_id, source_id)
        .await
}

pub async fn delete_summary(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<StatusCode> {
    let source_id = access.path_id("sourceId")?;
    state
        .sources
        .delete_summary(access.notebook_id, source_id)
        .await?;
    Ok(StatusCode::OK)
}

fn multipart_error(error: MultipartError) -> Error {
    Error::InvalidInput(format!("Invalid multipart body: {}", error.body_text()))
}
