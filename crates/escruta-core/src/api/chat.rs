//! Notebook chat, summary and example question endpoints
//!
//! Model failures are reported with fixed messages rather than problem
//! documents, so clients can show them as they are.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::AppState;
use super::extract::{ApiJson, NotebookAccess};
use crate::domain::{ChatMemoryMessage, ChatReply, ChatRequest};
use crate::error::{Error, Result};

const SUMMARY_FAILED: &str = "An error occurred while generating the summary. Please try again.";
const SUMMARY_READ_FAILED: &str = "An error occurred while retrieving the summary. Please try again.";
const QUESTIONS_FAILED: &str = "An error occurred while generating the questions. Please try again.";

pub async fn chat(
    State(state): State<AppState>,
    access: NotebookAccess,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return e.into_response();
    }

    match state.chat.chat(access.notebook_id, request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            tracing::error!(notebook_id = %access.notebook_id, "Chat request failed: {}", e);
            chat_failed()
        }
    }
}

/// Plain reply for a failed turn; the client shows `content` as is
fn chat_failed() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ChatReply::failure())).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    pub conversation_id: String,
    pub messages: Vec<ChatMemoryMessage>,
}

pub async fn history(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<Json<ConversationHistory>> {
    let conversation_id = conversation_id(&access)?;
    let messages = state
        .chat
        .history(access.notebook_id, &conversation_id)
        .await?;

    Ok(Json(ConversationHistory {
        conversation_id,
        messages,
    }))
}

pub async fn clear_history(
    State(state): State<AppState>,
    access: NotebookAccess,
) -> Result<StatusCode> {
    let conversation_id = conversation_id(&access)?;
    state
        .chat
        .clear_history(access.notebook_id, &conversation_id)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn generate_summary(State(state): State<AppState>, access: NotebookAccess) -> Response {
    match state.chat.generate_summary(access.notebook_id).await {
        Ok(summary) => summary.into_response(),
        Err(Error::NoContent(message)) => (StatusCode::BAD_REQUEST, message).into_response(),
        Err(e) => {
            tracing::error!(notebook_id = %access.notebook_id, "Summary generation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, SUMMARY_FAILED).into_response()
        }
    }
}

pub async fn get_summary(State(state): State<AppState>, access: NotebookAccess) -> Response {
    match state.chat.summary(access.notebook_id).await {
        Ok(summary) => summary.into_response(),
        Err(e @ Error::NotFound(_)) => e.into_response(),
        Err(e) => {
            tracing::error!(notebook_id = %access.notebook_id, "Failed to read summary: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, SUMMARY_READ_FAILED).into_response()
        }
    }
}

pub async fn example_questions(State(state): State<AppState>, access: NotebookAccess) -> Response {
    match state.chat.example_questions(access.notebook_id).await {
        Ok(questions) => Json(questions).into_response(),
        Err(Error::NoContent(message)) => (StatusCode::BAD_REQUEST, message).into_response(),
        Err(e) => {
            tracing::error!(notebook_id = %access.notebook_id, "Example questions failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, QUESTIONS_FAILED).into_response()
        }
    }
}

fn conversation_id(access: &NotebookAccess) -> Result<String> {
    access
        .param("conversationId")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_field("conversationId", "must not be blank"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::extract::tests::problem_body;
    use axum::http::header::CONTENT_TYPE;

    #[tokio::test]
    async fn test_chat_failure_body() {
        let response = chat_failed();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let (status, json) = problem_body(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            serde_json::json!({
                "content": "An error occurred while processing your request. Please try again.",
                "conversationId": null,
                "citedSources": []
            })
        );
    }

    #[test]
    fn test_blank_conversation_id_rejected() {
        let access = NotebookAccess::with_params(
            crate::api::extract::tests::owner(),
            &[("conversationId", "  ")],
        );
        assert!(matches!(
            conversation_id(&access).unwrap_err(),
            Error::Validation(_)
        ));
    }
}
