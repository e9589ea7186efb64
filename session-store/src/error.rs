use thiserror::Error;

/// Errors raised by session backends.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("[Session Store] invalid configuration: {0}")]
    Config(String),

    #[error("[Session Store] invalid conversation id: {0}")]
    InvalidId(String),

    #[error("[Session Store] backend failure: {0}")]
    Backend(String),

    #[error("[Session Store] corrupt history payload: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
