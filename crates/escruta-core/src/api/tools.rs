//! `/notebooks/{notebookId}/tools` endpoints
//!
//! Generation runs in the background; clients poll the job until it
//! completes or fails.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;
use super::extract::{ApiJson, NotebookAccess, type_mismatch};
use crate::domain::job::{GenerationAccepted, GenerationRequest};
use crate::domain::{GenerationJobResponse, JobType};
use crate::error::Result;

pub async fn generate(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiJson(request): ApiJson<GenerationRequest>,
) -> Result<(StatusCode, Json<GenerationAccepted>)> {
    let job_type = request.validate()?;
    let accepted = state
        .tools
        .start(access.notebook_id, access.user.id, job_type)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn job(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<GenerationJobResponse>> {
    let job_id = access.path_id("jobId")?;
    let job = state
        .tools
        .get(access.notebook_id, access.user.id, job_id)
        .await?;
    Ok(Json(GenerationJobResponse::from(&job)))
}

pub async fn jobs(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<Vec<GenerationJobResponse>>> {
    let jobs = state.tools.list(access.notebook_id, access.user.id).await?;
    Ok(Json(jobs.iter().map(GenerationJobResponse::from).collect()))
}

pub async fn latest(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<GenerationJobResponse>> {
    let job_type = requested_type(&access)?;
    let job = state
        .tools
        .latest(access.notebook_id, access.user.id, job_type)
        .await?;
    Ok(Json(GenerationJobResponse::from(&job)))
}

fn requested_type(access: &NotebookAccess) -> Result<JobType> {
    access
        .param("type")
        .and_then(JobType::parse)
        .ok_or_else(|| type_mismatch("type", "JobType"))
}
