//! Error taxonomy shared by the stores, the pipeline and the HTTP layer
//!
//! Shortener failures never appear here: the gateway reports them as
//! [`crate::shortener::ShortenOutcome::Unavailable`] values instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Token or uniqueness key has no matching resource
    #[error("Invalid or expired link: {0}")]
    NotFound(String),

    /// Caller lacks the role required for a privileged operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage layer failure, including records that no longer deserialize
    #[error("Storage failure: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Machine-readable code placed next to the message in JSON bodies
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Persistence(_) => "persistence",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Persistence(_) | AppError::Internal(_)) {
            error!(code = self.code(), error = %self, "request failed");
        }
        (
            self.status(),
            Json(json!({
                "error": self.to_string(),
                "code": self.code()
            })),
        )
            .into_response()
    }
}

macro_rules! persistence_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for AppError {
                fn from(err: $source) -> Self {
                    AppError::Persistence(err.to_string())
                }
            }
        )+
    };
}

persistence_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    serde_json::Error,
);
