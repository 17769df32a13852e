//! Request extractors: bearer authentication, notebook ownership and bodies
//! whose rejections render as problem documents

use std::collections::HashMap;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::AppState;
use super::problem::{INVALID_BODY, ProblemDetail};
use crate::domain::User;
use crate::error::Error;
use crate::security::token::bearer_token;

pub const INVALID_NOTEBOOK_ID: &str = "Invalid format for notebookId. It must be a valid UUID.";

const AUTHENTICATION_REQUIRED: &str = "Full authentication is required to access this resource";

/// Raw bearer token of the request
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| Error::Unauthorized(AUTHENTICATION_REQUIRED.to_string()))
    }
}

/// The authenticated user
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = state.auth.authenticate(&token).await?;
        Ok(CurrentUser(user))
    }
}

/// A `{notebookId}` route the current user owns
///
/// The id is parsed before authentication, so a malformed id is a 400 even
/// without a token. Unknown and foreign notebooks are both a 401.
#[derive(Debug, Clone)]
pub struct NotebookAccess {
    pub notebook_id: Uuid,
    pub user: User,
    params: HashMap<String, String>,
}

impl NotebookAccess {
    /// Parse another UUID path parameter of the route
    pub fn path_id(&self, name: &str) -> Result<Uuid, Error> {
        self.params
            .get(name)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| type_mismatch(name, "UUID"))
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn with_params(user: User, params: &[(&str, &str)]) -> Self {
        Self {
            notebook_id: Uuid::new_v4(),
            user,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl FromRequestParts<AppState> for NotebookAccess {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::InvalidInput(INVALID_NOTEBOOK_ID.to_string()))?;

        let notebook_id = params
            .get("notebookId")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| Error::InvalidInput(INVALID_NOTEBOOK_ID.to_string()))?;

        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        state.notebooks.ensure_owner(notebook_id, user.id).await?;

        Ok(Self {
            notebook_id,
            user,
            params,
        })
    }
}

/// Error for a path or query parameter that does not parse
pub fn type_mismatch(name: &str, required: &str) -> Error {
    Error::InvalidInput(format!(
        "Parameter '{}' is not of the required type '{}'.",
        name, required
    ))
}

/// JSON body; malformed input becomes a 400 problem
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ProblemDetail;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(ProblemDetail::new(
                    StatusCode::BAD_REQUEST,
                    rejection.body_text(),
                    INVALID_BODY,
                ))
            }
        }
    }
}

/// Query string; unparseable parameters become a 400 problem
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ProblemDetail;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(ProblemDetail::new(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
                "The request parameters are invalid",
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::response::{IntoResponse, Response};
    use serde_json::Value;

    pub(crate) fn owner() -> User {
        User::new("Ada Lovelace", "ada@example.com", "hash")
    }

    pub(crate) async fn problem_body(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_path_ids_are_type_mismatches() {
        for (param, raw) in [("noteId", "not-a-uuid"), ("jobId", "42"), ("sourceId", "")] {
            let access = NotebookAccess::with_params(owner(), &[(param, raw)]);
            let err = access.path_id(param).unwrap_err();

            let (status, json) = problem_body(err.into_response()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                json["detail"],
                format!("Parameter '{}' is not of the required type 'UUID'.", param)
            );
            assert_eq!(json["code"], "E201");
        }
    }

    #[test]
    fn test_path_id_parses_uuid() {
        let note_id = Uuid::new_v4();
        let raw = note_id.to_string();
        let access = NotebookAccess::with_params(owner(), &[("noteId", raw.as_str())]);
        assert_eq!(access.path_id("noteId").unwrap(), note_id);
        assert!(access.path_id("jobId").is_err());
    }

    #[test]
    fn test_type_mismatch_message() {
        assert_eq!(
            type_mismatch("noteId", "UUID").to_string(),
            "Parameter 'noteId' is not of the required type 'UUID'."
        );
    }

    #[tokio::test]
    async fn test_bearer_token_required() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/users/me")
            .body(())
            .unwrap()
            .into_parts();

        let err = BearerToken::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_bearer_token_parsed() {
        let (mut parts, _) = axum::http::Request::builder()
            .header("Authorization", "Bearer abc.def")
            .body(())
            .unwrap()
            .into_parts();

        let BearerToken(token) = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token, "abc.def");
    }
}
