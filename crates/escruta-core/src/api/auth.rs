//! Public authentication endpoints

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::AppState;
use super::extract::{ApiJson, ApiQuery, BearerToken};
use crate::domain::user::{AccessTokenResponse, Introspection, LoginRequest, RegisterRequest};
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct IntrospectQuery {
    pub token: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AccessTokenResponse>)> {
    let token = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AccessTokenResponse>> {
    Ok(Json(state.auth.login(request).await?))
}

pub async fn introspect(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IntrospectQuery>,
) -> Result<Json<Introspection>> {
    Ok(Json(state.auth.introspect(query.token.as_deref()).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode> {
    state.auth.logout(&token).await?;
    Ok(StatusCode::OK)
}
