use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use llm_service::AiLlmError;
use rag_pipeline::PipelineError;
use rag_store::RagError;
use serde::Serialize;
use session_store::SessionError;
use thiserror::Error;
use tracing::{error, warn};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / domain ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Status, stable code and the message shown to clients.
struct Classified {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Classified {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

fn classify_rag(err: &RagError) -> Classified {
    match err {
        RagError::Embedding(_) | RagError::VectorSizeMismatch { .. } => Classified::new(
            StatusCode::BAD_GATEWAY,
            "EMBEDDING_ERROR",
            "The embedding provider failed.",
        ),
        RagError::Retrieval(_) => Classified::new(
            StatusCode::BAD_GATEWAY,
            "RETRIEVAL_ERROR",
            "The vector store query failed.",
        ),
        RagError::StoreWrite(_) => Classified::new(
            StatusCode::BAD_GATEWAY,
            "STORE_WRITE_ERROR",
            "The vector store rejected the write.",
        ),
        RagError::Io { .. } => Classified::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "IO_ERROR",
            "The knowledge source could not be read.",
        ),
        RagError::Config(_) => Classified::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIG_ERROR",
            "The server is misconfigured.",
        ),
    }
}

impl AppError {
    fn classify(&self) -> Classified {
        match self {
            AppError::BadRequest(msg) => {
                Classified::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            AppError::Rag(e) => classify_rag(e),
            AppError::Pipeline(e) => match e {
                PipelineError::Validation(msg) => {
                    Classified::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                PipelineError::Session(SessionError::InvalidId(msg)) => Classified::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("invalid conversationId: {msg}"),
                ),
                PipelineError::Session(_) => Classified::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_ERROR",
                    "Conversation history is unavailable.",
                ),
                PipelineError::Llm(_) => Classified::new(
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "The language model failed to answer.",
                ),
                PipelineError::Rag(e) => classify_rag(e),
                PipelineError::Config(_) => Classified::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "The server is misconfigured.",
                ),
                PipelineError::Io { .. } => Classified::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "A prompt template could not be read.",
                ),
            },
            AppError::Config(_) => Classified::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "The server is misconfigured.",
            ),
            AppError::Bind(_) => Classified::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "BIND_ERROR",
                "Internal Server Error",
            ),
            AppError::Server(_) => Classified::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERVER_ERROR",
                "Internal Server Error",
            ),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Classified {
            status,
            code,
            message,
        } = self.classify();
        if status.is_server_error() {
            error!(code, status = status.as_u16(), detail = %self, "request failed");
        } else {
            warn!(code, status = status.as_u16(), detail = %self, "request rejected");
        }
        let body = ErrorBody {
            error: code,
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<AiLlmError> for AppError {
    fn from(err: AiLlmError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> (StatusCode, &'static str) {
        let c = err.classify();
        (c.status, c.code)
    }

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(
            status_of(PipelineError::Validation("empty".into()).into()),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
        assert_eq!(
            status_of(PipelineError::Llm("timeout".into()).into()),
            (StatusCode::BAD_GATEWAY, "LLM_ERROR")
        );
        assert_eq!(
            status_of(RagError::StoreWrite("HTTP 500".into()).into()),
            (StatusCode::BAD_GATEWAY, "STORE_WRITE_ERROR")
        );
        assert_eq!(
            status_of(PipelineError::Rag(RagError::Retrieval("x".into())).into()),
            (StatusCode::BAD_GATEWAY, "RETRIEVAL_ERROR")
        );
        assert_eq!(
            status_of(RagError::VectorSizeMismatch { got: 3, want: 4 }.into()),
            (StatusCode::BAD_GATEWAY, "EMBEDDING_ERROR")
        );
        assert_eq!(
            status_of(RagError::Config("bad".into()).into()),
            (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
        );
        assert_eq!(
            status_of(PipelineError::Session(SessionError::Backend("down".into())).into()),
            (StatusCode::INTERNAL_SERVER_ERROR, "SESSION_ERROR")
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let c = AppError::from(RagError::Retrieval("secret-host:5432 refused".into())).classify();
        assert!(!c.message.contains("secret-host"));
    }
}
