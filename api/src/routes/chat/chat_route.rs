//! POST /chat: answers a question within a conversation.

use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    routes::chat::chat_request::{ChatRequest, ChatResponse},
};

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:3000/chat \
///   -H 'content-type: application/json' \
///   -d '{"userQuestion":"What does the bootcamp cost?","conversationId":"c-42"}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Json<ChatResponse>> {
    let Json(body) = payload?;

    let reply = state
        .chat
        .chat(
            body.user_question.as_deref(),
            body.history,
            body.conversation_id.as_deref(),
        )
        .await?;

    Ok(Json(ChatResponse {
        response: reply.response,
        history: reply.history,
        conversation_id: reply.conversation_id.to_string(),
    }))
}
