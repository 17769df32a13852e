//! RFC 7807 problem documents for every error the API returns

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const ROUTE_NOT_AVAILABLE: &str = "The requested route is not available";
pub const INVALID_BODY: &str = "The request body is invalid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ProblemDetail {
    pub fn new(
        status: StatusCode,
        detail: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: "about:blank".to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            description: description.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    /// Unknown route or method
    pub fn not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("No static resource {}.", path.trim_start_matches('/')),
            ROUTE_NOT_AVAILABLE,
        )
    }
}

impl IntoResponse for ProblemDetail {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// HTTP status for an error
pub fn status_of(error: &Error) -> StatusCode {
    match error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::BadCredentials | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::Validation(_)
        | Error::InvalidInput(_)
        | Error::UnsupportedFileType(_)
        | Error::NoContent(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<&Error> for ProblemDetail {
    fn from(error: &Error) -> Self {
        let detail = match error {
            Error::DatabaseError(_) | Error::Io(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        Self::new(status_of(error), detail, error.description()).with_code(error.code())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(code = self.code(), "Request failed: {}", self);
        } else {
            tracing::debug!(code = self.code(), "Request rejected: {}", self);
        }
        ProblemDetail::from(&self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    #[test]
    fn test_bad_credentials_problem() {
        let problem = ProblemDetail::from(&Error::BadCredentials);
        assert_eq!(problem.status, 401);
        assert_eq!(problem.title, "Unauthorized");
        assert_eq!(problem.detail, "Bad credentials");
        assert_eq!(problem.description, "The email or password is incorrect");
        assert_eq!(problem.kind, "about:blank");
    }

    #[test]
    fn test_validation_problem() {
        let problem = ProblemDetail::from(&Error::Validation(vec![FieldError::new(
            "title",
            "must not be blank",
        )]));
        assert_eq!(problem.status, 400);
        assert_eq!(problem.detail, "Validation error in the submitted data.");
        assert_eq!(problem.description, "'title' must not be blank");
        assert_eq!(problem.code.as_deref(), Some("E200"));
    }

    #[test]
    fn test_statuses() {
        assert_eq!(status_of(&Error::NotFound("Note".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&Error::Conflict("dup".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(&Error::UnsupportedFileType("image/png".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(&Error::LLMError("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ProblemDetail::not_found("/nope")).unwrap();
        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["status"], 404);
        assert_eq!(json["description"], ROUTE_NOT_AVAILABLE);
        assert!(json.get("code").is_none());
    }
}
