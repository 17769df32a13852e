//! `/users` endpoints for the signed-in account

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::AppState;
use super::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::domain::BasicUser;
use crate::domain::user::ChangePasswordRequest;
use crate::error::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNameQuery {
    pub new_full_name: Option<String>,
}

pub async fn me(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Json<BasicUser> {
    Json(state.users.me(&user))
}

pub async fn change_name(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<ChangeNameQuery>,
) -> Result<StatusCode> {
    state
        .users
        .change_name(&user, query.new_full_name.as_deref())
        .await?;
    Ok(StatusCode::OK)
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state.users.change_password(&user, request).await?;
    Ok(StatusCode::OK)
}
