use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    #[error("{0}")]
    Configuration(String),

    // Raw upstream body, relayed as-is
    #[error("{0}")]
    Upstream(String),

    #[error("AI connection failed.")]
    Connection,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ai(#[from] AiError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Ai(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            // Backend details stay in the logs
            ApiError::Store(StoreError::Unavailable(detail)) => {
                tracing::error!(%detail, "task store unavailable");
                "Task store unavailable".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Server { status: u16, message: String },

    #[error("{0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("unsupported DATABASE_URL scheme: {0}")]
    UnsupportedDatabase(String),

    #[error("invalid bind address {0}")]
    InvalidBind(String),
}
